use async_trait::async_trait;

use super::{Markup, Notifier};
use crate::error::Result;

/// Prints the message instead of sending it.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    fn markup(&self) -> Markup {
        Markup::Plain
    }

    async fn send(&self, text: &str) -> Result<()> {
        println!("\n{}\n", text);
        Ok(())
    }
}
