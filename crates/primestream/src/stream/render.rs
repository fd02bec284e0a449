use crate::Error;

/// Turns prime stream events into output segments.
///
/// A [`PrimeStreamConsumer`] calls [`header`](Render::header) once before the
/// first value, [`value`](Render::value) for every prime,
/// [`line_break`](Render::line_break) after every full line, and exactly one
/// of [`footer`](Render::footer) or [`failure`](Render::failure) at the end.
///
/// [`PrimeStreamConsumer`]: crate::PrimeStreamConsumer
pub trait Render {
    type Output;

    /// Emitted once, right before the first value.
    fn header(&mut self, count: usize) -> Self::Output;

    fn value(&mut self, value: u64) -> Self::Output;

    fn line_break(&mut self) -> Self::Output;

    /// Closes a successful stream.
    fn footer(&mut self) -> Self::Output;

    /// Closes a failed stream, after whatever values were already rendered.
    fn failure(&mut self, count: usize, error: &Error) -> Self::Output;
}

/// Renders a prime stream as plain text lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainText;

impl Render for PlainText {
    type Output = String;

    fn header(&mut self, count: usize) -> String {
        format!("First {count} prime numbers:\n")
    }

    fn value(&mut self, value: u64) -> String {
        format!("{value} ")
    }

    fn line_break(&mut self) -> String {
        "\n".to_string()
    }

    fn footer(&mut self) -> String {
        "\n".to_string()
    }

    fn failure(&mut self, count: usize, error: &Error) -> String {
        format!("Cannot calculate first {count} prime numbers: {error}\n")
    }
}
