//! Terminal chat loop: read a line, forward it, print the reply.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::generator::TextGenerator;

pub const WELCOME: &str = "Welcome to the Menstrual Health Chatbot! Type 'exit' to stop.";
pub const FAREWELL: &str = "Goodbye! Stay healthy.";
pub const EXIT_KEYWORD: &str = "exit";

/// Runs until the user types the exit keyword or input ends.
///
/// A failed generation call ends the loop with that error.
pub async fn run<R, W>(generator: &dyn TextGenerator, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    output.write_all(format!("{WELCOME}\n").as_bytes()).await?;

    loop {
        output.write_all(b"\nYou: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            tracing::debug!("Input closed");
            output.write_all(b"\n").await?;
            output.flush().await?;
            return Ok(());
        };

        if line.to_lowercase() == EXIT_KEYWORD {
            output.write_all(format!("{FAREWELL}\n").as_bytes()).await?;
            output.flush().await?;
            return Ok(());
        }

        let reply = generator.generate(&line).await?;
        output
            .write_all(format!("\nChatbot: {reply}\n").as_bytes())
            .await?;
    }
}
