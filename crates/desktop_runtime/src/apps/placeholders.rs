//! Built-in content variants mounted by the default app registry.

use desktop_app_contract::{ContentContext, ContentError, HostedContent};

/// Shortcut and app reference shown by the help app.
pub const HELP_TEXT: &str = "\
Keyboard shortcuts:
  ctrl+alt+t  open a new terminal window
  alt+f4      close the active window

Applications:
  Terminal    command line
  Calculator  evaluates `<number> <op> <number>`
  Help        this reference";

/// Maximum number of lines the terminal keeps.
const TERMINAL_SCROLLBACK: usize = 500;

#[derive(Debug, Default)]
/// Terminal placeholder that echoes input into a bounded scrollback.
pub struct TerminalContent {
    context: Option<ContentContext>,
    lines: Vec<String>,
    focused: bool,
}

impl TerminalContent {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    fn push_line(&mut self, line: String) {
        self.lines.push(line);
        if self.lines.len() > TERMINAL_SCROLLBACK {
            let overflow = self.lines.len() - TERMINAL_SCROLLBACK;
            self.lines.drain(..overflow);
        }
    }
}

impl HostedContent for TerminalContent {
    fn init(&mut self, context: &ContentContext) -> Result<(), ContentError> {
        self.push_line(format!("terminal ready in window {}", context.window_id));
        self.context = Some(context.clone());
        Ok(())
    }

    fn process_command(&mut self, command: &str) -> Option<String> {
        let command = command.trim();
        match command {
            "" => Some(String::new()),
            "clear" => {
                self.lines.clear();
                Some(String::new())
            }
            "help" => Some(HELP_TEXT.to_string()),
            _ => {
                self.push_line(format!("$ {command}"));
                Some(command.to_string())
            }
        }
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn destroy(&mut self) {
        self.lines.clear();
        self.context = None;
        self.focused = false;
    }
}

#[derive(Debug, Default)]
/// Single-operation calculator.
pub struct CalculatorContent {
    last_result: Option<f64>,
}

impl CalculatorContent {
    pub fn last_result(&self) -> Option<f64> {
        self.last_result
    }

    fn evaluate(expression: &str) -> Result<f64, &'static str> {
        let mut parts = expression.split_whitespace();
        let (Some(lhs), Some(op), Some(rhs), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err("expected `<number> <op> <number>`");
        };
        let lhs: f64 = lhs.parse().map_err(|_| "left operand is not a number")?;
        let rhs: f64 = rhs.parse().map_err(|_| "right operand is not a number")?;
        match op {
            "+" => Ok(lhs + rhs),
            "-" => Ok(lhs - rhs),
            "*" | "x" => Ok(lhs * rhs),
            "/" if rhs == 0.0 => Err("division by zero"),
            "/" => Ok(lhs / rhs),
            _ => Err("unsupported operator"),
        }
    }
}

impl HostedContent for CalculatorContent {
    fn init(&mut self, _: &ContentContext) -> Result<(), ContentError> {
        self.last_result = None;
        Ok(())
    }

    fn process_command(&mut self, command: &str) -> Option<String> {
        Some(match Self::evaluate(command) {
            Ok(value) => {
                self.last_result = Some(value);
                value.to_string()
            }
            Err(reason) => format!("error: {reason}"),
        })
    }

    fn destroy(&mut self) {
        self.last_result = None;
    }
}

#[derive(Debug, Default)]
/// Static shortcut reference.
pub struct HelpContent {
    initialized: bool,
}

impl HostedContent for HelpContent {
    fn init(&mut self, _: &ContentContext) -> Result<(), ContentError> {
        self.initialized = true;
        Ok(())
    }

    fn process_command(&mut self, _: &str) -> Option<String> {
        self.initialized.then(|| HELP_TEXT.to_string())
    }

    fn destroy(&mut self) {
        self.initialized = false;
    }
}
