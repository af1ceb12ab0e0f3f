use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::sync::Arc;

use trid_executor::{ExecutorError, Invocation, ProcessRunner, Termination, TokioCommandExecutor};

use crate::classifier::classify;
use crate::error::ScanError;
use crate::parser::parse_report;
use crate::types::{MatchRecord, ScanOptions};

/// Builds TrID's argument list: `-v -n:<N> [-d:<defs>] <path>`.
pub fn build_args(options: &ScanOptions, path: &Path, max_matches: usize) -> Vec<OsString> {
    let mut args = vec![OsString::from("-v"), OsString::from(format!("-n:{}", max_matches))];
    if let Some(definitions) = &options.definitions {
        let mut flag = OsString::from("-d:");
        flag.push(definitions);
        args.push(flag);
    }
    args.push(path.as_os_str().to_os_string());
    args
}

/// Runs TrID against files and structures its report.
///
/// Holds no per-scan state, so one `Scanner` can serve concurrent scans.
#[derive(Clone)]
pub struct Scanner {
    options: ScanOptions,
    runner: Arc<dyn ProcessRunner>,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self::with_runner(options, Arc::new(TokioCommandExecutor::new()))
    }

    pub fn with_runner(options: ScanOptions, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { options, runner }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Identifies `path`, returning at most `max_matches` candidates in TrID's order.
    pub async fn scan(
        &self,
        path: impl AsRef<Path>,
        max_matches: usize,
    ) -> Result<Vec<MatchRecord>, ScanError> {
        let path = path.as_ref();

        if path.as_os_str().is_empty() {
            return Err(ScanError::NoFileSpecified);
        }

        if let Err(e) = tokio::fs::metadata(path).await {
            if e.kind() == io::ErrorKind::NotFound {
                return Err(ScanError::FileNotFound);
            }
            return Err(ScanError::Execution(ExecutorError::Io(e)));
        }

        if max_matches < 1 {
            return Err(ScanError::InvalidMatchCount);
        }

        let invocation = Invocation::new(self.options.command.clone(), self.options.timeout)
            .args(build_args(&self.options, path, max_matches));

        tracing::info!("Scanning {} with {}", path.display(), self.options.command);
        let run = self.runner.run(&invocation).await?;

        if let Some(diagnostic) = classify(&run.output) {
            tracing::info!("TrID reported {:?} for {}", diagnostic, path.display());
            return Err(diagnostic.into());
        }

        match run.termination {
            Termination::Exited => {}
            Termination::TimedOut { after } => {
                return Err(ScanError::Timeout(ExecutorError::Timeout(after)));
            }
            Termination::Failed { code } => {
                return Err(ScanError::Execution(ExecutorError::NonZeroExit { code }));
            }
        }

        let records = parse_report(&run.output);
        tracing::info!(
            "Identified {} candidate(s) for {} in {:?}",
            records.len(),
            path.display(),
            run.elapsed
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn lossy(args: Vec<OsString>) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_scanner_keeps_options() {
        let options = ScanOptions::default().with_command("trid-linux");
        let scanner = Scanner::new(options.clone());
        assert_eq!(scanner.options(), &options);
    }

    #[test]
    fn test_build_args_without_definitions() {
        let args = lossy(build_args(&ScanOptions::default(), Path::new("sample.pdf"), 3));
        assert_eq!(args, vec!["-v", "-n:3", "sample.pdf"]);
    }

    #[test]
    fn test_build_args_with_definitions() {
        let options = ScanOptions::default().with_definitions(PathBuf::from("defs/triddefs.trd"));
        let args = lossy(build_args(&options, Path::new("/tmp/x.bin"), 1));
        assert_eq!(args, vec!["-v", "-n:1", "-d:defs/triddefs.trd", "/tmp/x.bin"]);
    }
}
