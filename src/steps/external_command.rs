/*!
 * Step running an external command on each item once it is written.
 *
 * The command line is a template. These variables are replaced before it runs:
 * - `${inputPath}`: path of the input document
 * - `${outputPath}`: path of the output document
 * - `${srcLang}`: source locale
 * - `${trgLang}`: target locale
 *
 * The command runs through the system shell at the end of each item, so it
 * must come after the writer step to see the output file.
 */

use log::{debug, error, info, warn};
use std::any::Any;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::errors::{ConfigurationError, StepError};
use crate::locale::LocaleId;
use crate::params::{ParameterSchema, Parameters};
use crate::pipeline::{BatchItemContext, CancellationToken, Step};
use crate::resource::Event;

pub const STEP_NAME: &str = "external_command";

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Values substituted in the command template for one item
#[derive(Debug, Clone, Default, PartialEq)]
struct CommandVariables {
    input_path: String,
    output_path: String,
    source_locale: String,
    target_locale: String,
}

impl CommandVariables {
    fn expand(&self, template: &str) -> String {
        template
            .replace("${inputPath}", &self.input_path)
            .replace("${outputPath}", &self.output_path)
            .replace("${srcLang}", &self.source_locale)
            .replace("${trgLang}", &self.target_locale)
    }
}

#[derive(Debug)]
pub struct ExternalCommandStep {
    command: String,
    timeout: u64,
    target_locale: Option<LocaleId>,
    current: Option<CommandVariables>,
}

impl Default for ExternalCommandStep {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalCommandStep {
    pub fn new() -> Self {
        Self {
            command: String::new(),
            timeout: DEFAULT_TIMEOUT_SECONDS,
            target_locale: None,
            current: None,
        }
    }

    /// Create a step running the given command template
    pub fn with_command(command: &str, timeout_seconds: u64) -> Self {
        let mut step = Self::new();
        step.command = command.to_string();
        step.timeout = timeout_seconds;
        step
    }

    fn shell(command_line: &str) -> Command {
        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.args(["/C", command_line]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command_line]);
            c
        };
        // Own process group, so a timeout can stop every process of a shell pipeline
        #[cfg(unix)]
        command.process_group(0);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Run one command line, killing it and its children when it takes longer than the timeout
    fn execute(&self, command_line: &str) -> Result<(), StepError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let timeout = self.timeout;

        runtime.block_on(async move {
            let mut child = Self::shell(command_line).spawn()?;
            let pid = child.id();
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();

            let finished = {
                let run = async {
                    let (status, out, err) = tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
                    Ok::<_, std::io::Error>((status?, out?, err?))
                };
                tokio::select! {
                    result = run => Some(result),
                    _ = tokio::time::sleep(Duration::from_secs(timeout)) => None,
                }
            };

            let Some(result) = finished else {
                error!("Command timed out after {}s: {}", timeout, command_line);
                if let Some(pid) = pid {
                    kill_process_tree(pid);
                }
                if let Err(e) = child.kill().await {
                    warn!("Cannot kill command {}: {}", command_line, e);
                }
                return Err(StepError::Timeout {
                    step: STEP_NAME.to_string(),
                    seconds: timeout,
                });
            };

            let (status, stdout, stderr) = result?;
            if !status.success() {
                let stderr = String::from_utf8_lossy(&stderr);
                return Err(StepError::failure(
                    STEP_NAME,
                    format!("command exited with {}: {}", status, stderr.trim()),
                ));
            }
            debug!("Command output: {}", String::from_utf8_lossy(&stdout).trim());
            Ok(())
        })
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut bytes).await?;
    }
    Ok(bytes)
}

/// Kill a process and everything it started
///
/// On unix the process leads its own group, which is killed as a whole.
fn kill_process_tree(pid: u32) {
    let mut command = if cfg!(windows) {
        let mut c = std::process::Command::new("taskkill");
        c.args(["/T", "/F", "/PID", &pid.to_string()]);
        c
    } else {
        let mut c = std::process::Command::new("kill");
        c.args(["-KILL", "--", &format!("-{}", pid)]);
        c
    };
    match command.stdout(Stdio::null()).stderr(Stdio::null()).status() {
        Ok(status) if !status.success() => debug!("Process tree {} was already gone ({})", pid, status),
        Ok(_) => debug!("Killed process tree {}", pid),
        Err(e) => warn!("Cannot kill process tree {}: {}", pid, e),
    }
}

impl Step for ExternalCommandStep {
    fn name(&self) -> &str {
        STEP_NAME
    }

    fn description(&self) -> &str {
        "Run a shell command on each item after it is written"
    }

    fn parameter_schema(&self) -> ParameterSchema {
        ParameterSchema::new(STEP_NAME)
            .string("command", "", "Command template, e.g. 'tidy -m ${outputPath}'")
            .integer("timeout_seconds", DEFAULT_TIMEOUT_SECONDS as i64, "Seconds before the command is killed")
    }

    fn set_parameters(&mut self, params: &Parameters) -> Result<(), ConfigurationError> {
        let resolved = self.parameter_schema().resolve(params)?;
        self.command = resolved.get_str("command").unwrap_or_default().to_string();
        let timeout = resolved.get_i64("timeout_seconds").unwrap_or(DEFAULT_TIMEOUT_SECONDS as i64);
        self.timeout = u64::try_from(timeout)
            .ok()
            .filter(|t| *t > 0)
            .ok_or_else(|| ConfigurationError::InvalidParameter {
                owner: STEP_NAME.to_string(),
                key: "timeout_seconds".to_string(),
                expected: "a number of seconds above 0".to_string(),
            })?;
        Ok(())
    }

    fn set_target_locale(&mut self, locale: Option<&LocaleId>) {
        self.target_locale = locale.cloned();
    }

    fn start_batch_item(&mut self, context: &mut BatchItemContext) -> Result<(), StepError> {
        let path_string = |p: &std::path::Path| p.to_string_lossy().into_owned();
        self.current = Some(CommandVariables {
            input_path: context.document.path().map(path_string).unwrap_or_default(),
            output_path: context.output_path.as_deref().map(path_string).unwrap_or_default(),
            source_locale: context.source_locale.to_string(),
            target_locale: context
                .target_locale
                .as_ref()
                .or(self.target_locale.as_ref())
                .map(LocaleId::to_string)
                .unwrap_or_default(),
        });
        Ok(())
    }

    fn handle(&mut self, event: Event, _token: &CancellationToken) -> Result<Event, StepError> {
        Ok(event)
    }

    fn end_batch_item(&mut self) -> Result<(), StepError> {
        let Some(variables) = self.current.take() else {
            return Ok(());
        };
        if self.command.trim().is_empty() {
            return Ok(());
        }
        let command_line = variables.expand(&self.command);
        info!("Running: {}", command_line);
        self.execute(&command_line)
    }

    fn cancel(&mut self) {
        self.current = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables() -> CommandVariables {
        CommandVariables {
            input_path: "in/a.txt".into(),
            output_path: "out/a.fr.txt".into(),
            source_locale: "en".into(),
            target_locale: "fr".into(),
        }
    }

    #[test]
    fn test_expand_shouldReplaceAllVariables() {
        let line = variables().expand("conv ${inputPath} ${outputPath} -s ${srcLang} -t ${trgLang} ${other}");
        assert_eq!(line, "conv in/a.txt out/a.fr.txt -s en -t fr ${other}");
    }

    #[test]
    fn test_setParameters_withZeroTimeout_shouldFail() {
        let mut step = ExternalCommandStep::new();
        let params = Parameters::new().with("timeout_seconds", 0);
        assert!(step.set_parameters(&params).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_successfulCommand_shouldBeOk() {
        let step = ExternalCommandStep::with_command("true", 5);
        assert!(step.execute("true").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_failingCommand_shouldBeFailure() {
        let step = ExternalCommandStep::new();
        let result = step.execute("echo broken >&2; exit 3");
        assert!(matches!(result, Err(StepError::Failure { message, .. }) if message.contains("broken")));
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_timedOutPipeline_shouldStopChildren() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("late");
        let line = format!("(sleep 2 && touch {}) | cat", marker.display());

        let step = ExternalCommandStep::with_command(&line, 1);
        let result = step.execute(&line);
        assert!(matches!(result, Err(StepError::Timeout { seconds: 1, .. })));

        std::thread::sleep(Duration::from_secs(3));
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_slowCommand_shouldTimeOut() {
        let step = ExternalCommandStep::with_command("sleep 5", 1);
        let result = step.execute("sleep 5");
        assert!(matches!(result, Err(StepError::Timeout { seconds: 1, .. })));
    }
}
