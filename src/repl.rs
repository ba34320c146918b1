//! Interactive chat loop.
//!
//! Reads one request per line, hands it to the agent and prints the reply.
//! An ordinary failure inside an iteration is shown to the user, recorded
//! in the reflection log and the loop carries on.

use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};

use crate::agent::{Agent, AgentError};
use crate::store::{ProjectStore, StoreError};

#[derive(Debug, thiserror::Error)]
enum TurnError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("output error: {0}")]
    Output(#[from] io::Error),
}

/// True for the words that end the session.
pub fn is_exit_command(line: &str) -> bool {
    let word = line.trim();
    word.eq_ignore_ascii_case("exit") || word.eq_ignore_ascii_case("quit")
}

/// Run the session until EOF or an exit command. Only a failure to read
/// input ends it early.
pub async fn run<A, R, W>(
    agent: &A,
    store: &ProjectStore,
    model_name: &str,
    mut input: R,
    out: &mut W,
) -> io::Result<()>
where
    A: Agent + ?Sized,
    R: BufRead,
    W: Write,
{
    writeln!(out, "J.A.R.V.I.S. initialized with model: {}", model_name)?;
    writeln!(out, "Current self-improvement history:\n{}", store.get_reflections())?;

    let mut line = String::new();
    loop {
        if let Err(e) = prompt(store, out) {
            report(store, out, &e);
        }

        line.clear();
        if input.read_line(&mut line)? == 0 || is_exit_command(&line) {
            writeln!(out, "J.A.R.V.I.S. powering down. Have a productive day, Sir.")?;
            break;
        }

        let request = line.trim();
        if request.is_empty() {
            continue;
        }

        if let Err(e) = respond(agent, request, out).await {
            report(store, out, &e);
        }
    }

    info!("session ended");
    Ok(())
}

fn prompt<W: Write>(store: &ProjectStore, out: &mut W) -> Result<(), TurnError> {
    let pending = store.pending_proposals()?;
    if !pending.is_empty() {
        writeln!(
            out,
            "\n[ALERT] Sir, you have pending code proposals: {}. Please review them.",
            pending.join(", ")
        )?;
    }
    write!(out, "\nSir: ")?;
    out.flush()?;
    Ok(())
}

async fn respond<A, W>(agent: &A, request: &str, out: &mut W) -> Result<(), TurnError>
where
    A: Agent + ?Sized,
    W: Write,
{
    let reply = agent.run(request).await?;
    writeln!(out, "\nJ.A.R.V.I.S.: {}", reply)?;
    Ok(())
}

fn report<W: Write>(store: &ProjectStore, out: &mut W, e: &TurnError) {
    error!(error = %e, "turn failed");
    let _ = writeln!(out, "\n[CRITICAL ERROR] A failure occurred: {}", e);
    if let Err(log_err) = store.log_reflection(&format!("System Error encountered: {}", e)) {
        warn!(error = %log_err, "could not record failure in reflection log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::MockAgent;
    use crate::llm::LlmError;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn transcript(agent: &MockAgent, store: &ProjectStore, input: &str) -> String {
        let mut out = Vec::new();
        tokio_test::block_on(run(agent, store, "test-model", Cursor::new(input.to_string()), &mut out))
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_exit_keywords() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("  QUIT\n"));
        assert!(is_exit_command("Exit\r\n"));
        assert!(!is_exit_command("exit now"));
        assert!(!is_exit_command(""));
    }

    #[test]
    fn test_reply_printed_then_exit() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path()).unwrap();
        let mut agent = MockAgent::new();
        agent
            .expect_run()
            .withf(|input| input.contains("status report"))
            .times(1)
            .returning(|_| Ok("All systems nominal, Sir.".to_string()));

        let text = transcript(&agent, &store, "status report\n\nquit\nnever read\n");
        assert!(text.starts_with("J.A.R.V.I.S. initialized with model: test-model\n"));
        assert!(text.contains("J.A.R.V.I.S.: All systems nominal, Sir."));
        assert!(text.ends_with("powering down. Have a productive day, Sir.\n"));
    }

    #[test]
    fn test_eof_ends_session() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path()).unwrap();
        let mut agent = MockAgent::new();
        agent.expect_run().never();

        let text = transcript(&agent, &store, "");
        assert!(text.contains("powering down"));
    }

    #[test]
    fn test_agent_failure_is_logged_and_loop_continues() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path()).unwrap();
        let mut agent = MockAgent::new();
        let mut calls = 0;
        agent.expect_run().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(AgentError::Llm(LlmError::EmptyResponse))
            } else {
                Ok("Recovered, Sir.".to_string())
            }
        });

        let text = transcript(&agent, &store, "first\nsecond\nexit\n");
        assert!(text.contains("[CRITICAL ERROR] A failure occurred: LLM response contained no choices"));
        assert!(text.contains("J.A.R.V.I.S.: Recovered, Sir."));
        assert!(store
            .get_reflections()
            .contains("System Error encountered: LLM response contained no choices"));
    }

    /// Input source whose every read fails.
    struct BrokenInput;

    impl io::Read for BrokenInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "stdin closed badly"))
        }
    }

    impl BufRead for BrokenInput {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            Err(io::Error::new(io::ErrorKind::Other, "stdin closed badly"))
        }

        fn consume(&mut self, _amt: usize) {}
    }

    #[test]
    fn test_input_read_error_ends_session() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path()).unwrap();
        let mut agent = MockAgent::new();
        agent.expect_run().never();

        let mut out = Vec::new();
        let err = tokio_test::block_on(run(&agent, &store, "test-model", BrokenInput, &mut out))
            .unwrap_err();
        assert_eq!(err.to_string(), "stdin closed badly");

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("\nSir: "));
        assert!(!store.get_reflections().contains("System Error encountered"));
    }

    #[test]
    fn test_pending_proposal_alert() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path()).unwrap();
        store.save_proposal("logic.py", "pass\n");
        let agent = MockAgent::new();

        let text = transcript(&agent, &store, "exit\n");
        assert!(text.contains(
            "[ALERT] Sir, you have pending code proposals: logic.py.new. Please review them."
        ));
    }
}
