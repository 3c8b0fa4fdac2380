//! Interactive terminal front end.
//!
//! [`ConsoleSession::run`] is the presentation loop. It owns the output and
//! multiplexes three inputs with `crossbeam_channel::select!`: lines typed by
//! the user, feed events posted by the listener thread, and a shutdown signal.
//! Feed events are therefore printed on the presentation thread only.
//!
//! Each order is collected with three prompts (side, price, quantity) and then
//! submitted synchronously; feed events arriving meanwhile queue in the channel.
use std::io::{self, Write};

use crossbeam_channel::{Receiver, never, select};
use log::{debug, info};
use order_common::{ClientError, Order, Side};

use crate::sink::FeedEvent;
use crate::submitter::{OrderSubmitter, Response};

/// Typing this at any prompt ends the session.
pub const QUIT_COMMAND: &str = "quit";

const SIDE_PROMPT: &str = "Enter side (0 for Buy, 1 for Sell): ";
const PRICE_PROMPT: &str = "Enter price: ";
const QUANTITY_PROMPT: &str = "Enter quantity: ";

/// What a line of input did to the prompt sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptStep {
    /// More fields are needed.
    Continue,
    /// All three fields were collected into a valid order.
    Ready(Order),
    /// The last answer was invalid; the same field is asked again.
    Rejected(ClientError),
    /// The user asked to leave.
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Side,
    Price,
    Quantity,
}

/// Collects side, price and quantity one line at a time.
#[derive(Debug)]
pub struct OrderPrompt {
    field: Field,
    side: Option<Side>,
    price: Option<String>,
}

impl Default for OrderPrompt {
    fn default() -> Self {
        OrderPrompt::new()
    }
}

impl OrderPrompt {
    /// Start at the side prompt.
    pub fn new() -> Self {
        OrderPrompt {
            field: Field::Side,
            side: None,
            price: None,
        }
    }

    /// Text asking for the next field.
    pub fn prompt(&self) -> &'static str {
        match self.field {
            Field::Side => SIDE_PROMPT,
            Field::Price => PRICE_PROMPT,
            Field::Quantity => QUANTITY_PROMPT,
        }
    }

    /// Feed one input line.
    ///
    /// Each answer is checked as soon as it is typed. Empty answers re-ask the
    /// same field, and so do invalid ones, after returning `Rejected`.
    pub fn accept(&mut self, line: &str) -> PromptStep {
        let answer = line.trim();
        if answer.eq_ignore_ascii_case(QUIT_COMMAND) {
            self.reset();
            return PromptStep::Quit;
        }
        if answer.is_empty() {
            return PromptStep::Continue;
        }

        let step = match self.field {
            Field::Side => Side::parse_input(answer).map(|side| {
                self.side = Some(side);
                self.field = Field::Price;
                PromptStep::Continue
            }),
            Field::Price => Order::check_field("price", answer).map(|price| {
                self.price = Some(price);
                self.field = Field::Quantity;
                PromptStep::Continue
            }),
            Field::Quantity => self.complete(answer),
        };
        step.unwrap_or_else(PromptStep::Rejected)
    }

    fn complete(&mut self, quantity: &str) -> Result<PromptStep, ClientError> {
        let (Some(side), Some(price)) = (self.side, self.price.as_deref()) else {
            self.reset();
            return Err(ClientError::Unexpected("order prompt lost its fields".to_string()));
        };
        let order = Order::new(side, price, quantity)?;
        self.reset();
        Ok(PromptStep::Ready(order))
    }

    fn reset(&mut self) {
        self.field = Field::Side;
        self.side = None;
        self.price = None;
    }
}

/// Why a console session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed the quit command.
    Quit,
    /// Input reached end of file.
    InputClosed,
    /// A shutdown signal arrived (e.g. Ctrl+C).
    Shutdown,
}

/// Presentation loop tying the prompts, the submitter and the feed together.
pub struct ConsoleSession<W: Write> {
    submitter: OrderSubmitter,
    prompt: OrderPrompt,
    out: W,
}

impl<W: Write> ConsoleSession<W> {
    /// Create a session writing to `out`.
    pub fn new(submitter: OrderSubmitter, out: W) -> Self {
        ConsoleSession {
            submitter,
            prompt: OrderPrompt::new(),
            out,
        }
    }

    /// Run until quit, end of input, or shutdown.
    ///
    /// `feed` may disconnect at any time (listener stopped); the session keeps
    /// running without it.
    pub fn run(
        &mut self,
        lines: &Receiver<String>,
        feed: &Receiver<FeedEvent>,
        shutdown: &Receiver<()>,
    ) -> io::Result<SessionEnd> {
        let no_feed = never();
        let mut feed_open = true;
        self.show_prompt()?;

        loop {
            let feed_rx = if feed_open { feed } else { &no_feed };
            select! {
                recv(shutdown) -> _ => {
                    info!("Console session shutting down");
                    writeln!(self.out)?;
                    return Ok(SessionEnd::Shutdown);
                },
                recv(lines) -> line => match line {
                    Ok(line) => {
                        if let Some(end) = self.handle_line(&line)? {
                            return Ok(end);
                        }
                    }
                    Err(_) => {
                        debug!("Console input closed");
                        writeln!(self.out)?;
                        return Ok(SessionEnd::InputClosed);
                    }
                },
                recv(feed_rx) -> event => match event {
                    Ok(event) => self.show_feed(&event)?,
                    Err(_) => {
                        debug!("Feed channel closed");
                        feed_open = false;
                    }
                },
            }
        }
    }

    /// Consume the session and hand back the writer.
    pub fn into_output(self) -> W {
        self.out
    }

    fn handle_line(&mut self, line: &str) -> io::Result<Option<SessionEnd>> {
        match self.prompt.accept(line) {
            PromptStep::Continue => {}
            PromptStep::Quit => return Ok(Some(SessionEnd::Quit)),
            PromptStep::Rejected(e) => writeln!(self.out, "{}. Try again.", e)?,
            PromptStep::Ready(order) => {
                let result = self.submitter.submit(&order);
                self.show_response(&result)?;
            }
        }
        self.show_prompt()?;
        Ok(None)
    }

    fn show_prompt(&mut self) -> io::Result<()> {
        write!(self.out, "{}", self.prompt.prompt())?;
        self.out.flush()
    }

    fn show_response(&mut self, result: &Result<Response, ClientError>) -> io::Result<()> {
        match result {
            Ok(response) => writeln!(self.out, "Server response: {}", response.as_str().trim_end()),
            Err(e) => writeln!(self.out, "Order not sent: {}", e),
        }
    }

    fn show_feed(&mut self, event: &FeedEvent) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "[feed] {}", event.to_string().trim_end())?;
        self.show_prompt()
    }
}
