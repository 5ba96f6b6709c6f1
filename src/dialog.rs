// ABOUTME: Modal confirmation dialog shown after a login attempt
// ABOUTME: Offers exactly one button, proceed on success or retry on failure, and resolves once

use console::{measure_text_width, style, Term};
use dialoguer::{theme::ColorfulTheme, Select};
use log::{debug, info, warn};
use std::io::{self, Write};

use crate::error::{generic_error, AppError};
use crate::models::{LoginOutcome, LoginResult};

pub const DEFAULT_TITLE: &str = "TAL 登录";

/// The single action a dialog offers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
    /// Hand the session payload to the caller
    Proceed,
    /// Discard the attempt and let the caller exit or ask again
    Retry,
}

impl DialogAction {
    pub fn label(self) -> &'static str {
        match self {
            DialogAction::Proceed => "下一步 (Next)",
            DialogAction::Retry => "重试 (Retry)",
        }
    }
}

/// Everything a backend needs to draw the dialog
#[derive(Debug, Clone, Copy)]
pub struct DialogView<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub success: bool,
    pub action: DialogAction,
}

/// Draws a dialog and waits for its one button.
///
/// `present` returns once the button has been pressed. An error means the
/// dialog could not be shown or interacted with at all.
pub trait DialogBackend {
    fn present(&mut self, view: &DialogView<'_>) -> Result<(), AppError>;
}

impl<B: DialogBackend + ?Sized> DialogBackend for &mut B {
    fn present(&mut self, view: &DialogView<'_>) -> Result<(), AppError> {
        (**self).present(view)
    }
}

impl<B: DialogBackend + ?Sized> DialogBackend for Box<B> {
    fn present(&mut self, view: &DialogView<'_>) -> Result<(), AppError> {
        (**self).present(view)
    }
}

/// Shows a [`LoginResult`] and turns the button press into a [`LoginOutcome`].
///
/// Showing -> Proceed when the login succeeded, Showing -> Retry when it did
/// not. `show` consumes the dialog, so it resolves exactly once.
#[derive(Debug)]
pub struct ConfirmationDialog {
    title: String,
    result: LoginResult,
}

impl ConfirmationDialog {
    pub fn new(result: LoginResult) -> Self {
        ConfirmationDialog {
            title: DEFAULT_TITLE.to_string(),
            result,
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    /// The only action reachable from this dialog
    pub fn action(&self) -> DialogAction {
        if self.result.is_success() {
            DialogAction::Proceed
        } else {
            DialogAction::Retry
        }
    }

    pub fn result(&self) -> &LoginResult {
        &self.result
    }

    /// Block on `backend` until the button is pressed, then close.
    ///
    /// A backend that fails resolves as Retry, the only exit that carries no payload.
    pub fn show<B: DialogBackend + ?Sized>(self, backend: &mut B) -> LoginOutcome {
        let action = self.action();
        let view = DialogView {
            title: &self.title,
            message: self.result.message(),
            success: self.result.is_success(),
            action,
        };

        if let Err(err) = backend.present(&view) {
            warn!("Login dialog could not be shown: {}", err);
            return LoginOutcome::retry();
        }

        debug!("Dialog closed with {:?}", action);
        match action {
            DialogAction::Proceed => LoginOutcome::proceed(self.result.into_payload()),
            DialogAction::Retry => LoginOutcome::retry(),
        }
    }
}

/// Draws the dialog on the terminal with a one-item dialoguer menu
pub struct TerminalBackend {
    term: Term,
    theme: ColorfulTheme,
}

impl TerminalBackend {
    pub fn new() -> Self {
        Self::with_term(Term::stderr())
    }

    pub fn with_term(term: Term) -> Self {
        TerminalBackend {
            term,
            theme: ColorfulTheme::default(),
        }
    }

    /// Whether stderr is attached to an interactive terminal
    pub fn is_available(&self) -> bool {
        self.term.is_term()
    }
}

impl Default for TerminalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogBackend for TerminalBackend {
    fn present(&mut self, view: &DialogView<'_>) -> Result<(), AppError> {
        if !self.is_available() {
            return Err(generic_error(
                "no interactive terminal available for the login dialog",
            ));
        }

        let mut window = DialogWindow::open(&self.term, view)?;
        Select::with_theme(&self.theme)
            .items(&[view.action.label()])
            .default(0)
            .report(false)
            .interact_on(&self.term)?;
        window.close()?;
        Ok(())
    }
}

/// The frame drawn above the button. Cleared again when closed or dropped.
struct DialogWindow<'a> {
    term: &'a Term,
    lines: usize,
    closed: bool,
}

impl<'a> DialogWindow<'a> {
    fn open(term: &'a Term, view: &DialogView<'_>) -> io::Result<Self> {
        let width = usize::from(term.size().1).max(20);
        let rule = "─".repeat(width.min(50));

        let mut window = DialogWindow {
            term,
            lines: 0,
            closed: false,
        };
        term.hide_cursor()?;
        window.write_line(&style(view.title).cyan().bold().to_string(), width)?;
        window.write_line(&style(&rule).dim().to_string(), width)?;
        for line in view.message.lines() {
            let line = if view.success {
                style(line).green()
            } else {
                style(line).red()
            };
            window.write_line(&line.to_string(), width)?;
        }
        window.write_line(&style(&rule).dim().to_string(), width)?;
        Ok(window)
    }

    fn write_line(&mut self, line: &str, width: usize) -> io::Result<()> {
        self.term.write_line(line)?;
        // Wrapped lines take more than one row
        let rows = measure_text_width(line).max(1).div_ceil(width);
        self.lines += rows;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.term.clear_last_lines(self.lines)?;
        self.term.show_cursor()
    }
}

impl Drop for DialogWindow<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!("Failed to clear login dialog: {}", err);
        }
    }
}

/// Prints the dialog and presses its button straight away.
///
/// For scripted or non-interactive runs where nobody can answer a prompt.
pub struct HeadlessBackend<W: Write = io::Stderr> {
    out: W,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        HeadlessBackend { out: io::stderr() }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> HeadlessBackend<W> {
    pub fn with_writer(out: W) -> Self {
        HeadlessBackend { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DialogBackend for HeadlessBackend<W> {
    fn present(&mut self, view: &DialogView<'_>) -> Result<(), AppError> {
        info!("{}: {} -> {:?}", view.title, view.message, view.action);
        writeln!(self.out, "[{}] {}", view.title, view.message)?;
        writeln!(self.out, "> {}", view.action.label())?;
        self.out.flush()?;
        Ok(())
    }
}
