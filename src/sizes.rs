//! Discover the byte widths of C integer types on the target.
//!
//! A small C program prints `sizeof(<type>) = <n>` for int, long, long long
//! and size_t, in that order. The generator needs all four to pick matching
//! managed types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::error::ConfigureError;
use crate::util::fs::write_string;
use crate::util::process::ProcessBuilder;

/// Number of values the size probe must print.
pub const SIZE_COUNT: usize = 4;

/// Default name of the size probe source in the work directory.
pub const SIZE_PROBE_FILE: &str = "sizes.c";

/// Built-in size probe, used when the work directory has none.
pub const SIZE_PROBE_SOURCE: &str = r#"#include <stdio.h>
#include <stddef.h>

int main(void)
{
    printf("sizeof(int) = %lu\n", (unsigned long) sizeof(int));
    printf("sizeof(long) = %lu\n", (unsigned long) sizeof(long));
    printf("sizeof(long long) = %lu\n", (unsigned long) sizeof(long long));
    printf("sizeof(size_t) = %lu\n", (unsigned long) sizeof(size_t));
    return 0;
}
"#;

/// Byte widths of int, long, long long and size_t.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeSet {
    pub int: u32,
    pub long: u32,
    pub long_long: u32,
    pub size_t: u32,
}

impl SizeSet {
    /// Build from values in probe order. Anything but four values is an error.
    pub fn from_values(values: &[u32]) -> Result<Self, ConfigureError> {
        match *values {
            [int, long, long_long, size_t] => Ok(SizeSet {
                int,
                long,
                long_long,
                size_t,
            }),
            _ => Err(ConfigureError::SizeCountMismatch {
                expected: SIZE_COUNT,
                found: values.len(),
            }),
        }
    }

    /// Parse size probe output, one value per non-empty line.
    ///
    /// The value is the decimal number at the end of each line.
    pub fn parse(output: &str) -> Result<Self, ConfigureError> {
        let lines: Vec<&str> = output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        if lines.len() != SIZE_COUNT {
            return Err(ConfigureError::SizeCountMismatch {
                expected: SIZE_COUNT,
                found: lines.len(),
            });
        }

        let values = lines
            .iter()
            .map(|line| parse_trailing_number(line))
            .collect::<Result<Vec<u32>, _>>()?;

        SizeSet::from_values(&values)
    }

    /// Values in probe order.
    pub fn as_array(&self) -> [u32; SIZE_COUNT] {
        [self.int, self.long, self.long_long, self.size_t]
    }
}

impl fmt::Display for SizeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "int={} long={} long long={} size_t={}",
            self.int, self.long, self.long_long, self.size_t
        )
    }
}

fn trailing_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*$").expect("trailing number pattern is valid"))
}

fn parse_trailing_number(line: &str) -> Result<u32, ConfigureError> {
    let malformed = || ConfigureError::MalformedSizeOutput {
        line: line.to_string(),
    };

    let caps = trailing_number().captures(line).ok_or_else(malformed)?;
    let value: u32 = caps[1].parse().map_err(|_| malformed())?;
    if value == 0 {
        return Err(malformed());
    }
    Ok(value)
}

/// Compiles and runs the size probe with the host C compiler.
#[derive(Debug, Clone)]
pub struct SizeProbe {
    cc: PathBuf,
    source: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl SizeProbe {
    /// Create a size probe using `cc`.
    pub fn new(cc: impl Into<PathBuf>) -> Self {
        SizeProbe {
            cc: cc.into(),
            source: None,
            timeout: None,
        }
    }

    /// Use this probe source instead of the built-in one.
    pub fn with_source(mut self, source: Option<PathBuf>) -> Self {
        self.source = source;
        self
    }

    /// Bound the compile and the run.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Compile, run and parse.
    pub fn run(&self) -> Result<SizeSet> {
        let scratch = tempfile::Builder::new()
            .prefix("mpiconf-sizes-")
            .tempdir()
            .context("failed to create size probe scratch directory")?;

        let source = match self.source {
            Some(ref path) if path.is_file() => path.clone(),
            _ => {
                let path = scratch.path().join(SIZE_PROBE_FILE);
                write_string(&path, SIZE_PROBE_SOURCE)?;
                path
            }
        };
        let binary = scratch.path().join("sizes.out");

        ProcessBuilder::new(&self.cc)
            .arg(&source)
            .arg("-o")
            .arg(&binary)
            .timeout(self.timeout)
            .exec_and_check()?;

        let output = ProcessBuilder::new(&binary)
            .timeout(self.timeout)
            .exec_and_check()?;

        let sizes = SizeSet::parse(&String::from_utf8_lossy(&output.stdout))?;
        tracing::info!("Sizes: {}", sizes);
        Ok(sizes)
    }
}

/// Size probe source inside `work_dir`, if present.
pub fn find_probe_source(work_dir: &Path, name: &Path) -> Option<PathBuf> {
    let path = crate::util::fs::resolve_in(work_dir, name);
    path.is_file().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_four_values() {
        let output = "sizeof(int) = 4\nsizeof(long) = 8\nsizeof(long long) = 8\nsizeof(size_t) = 8\n";
        let sizes = SizeSet::parse(output).unwrap();

        assert_eq!(
            sizes,
            SizeSet {
                int: 4,
                long: 8,
                long_long: 8,
                size_t: 8
            }
        );
        assert_eq!(sizes.as_array(), [4, 8, 8, 8]);
    }

    #[test]
    fn test_parse_bare_numbers() {
        let sizes = SizeSet::parse("4\n4\n8\n4\n").unwrap();
        assert_eq!(sizes.as_array(), [4, 4, 8, 4]);
    }

    #[test]
    fn test_three_lines_is_fatal() {
        let err = SizeSet::parse("4\n8\n8\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigureError::SizeCountMismatch {
                expected: 4,
                found: 3
            }
        ));
    }

    #[test]
    fn test_five_lines_is_fatal() {
        let err = SizeSet::parse("4\n8\n8\n8\n16\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigureError::SizeCountMismatch { found: 5, .. }
        ));
    }

    #[test]
    fn test_line_without_number_is_malformed() {
        let err = SizeSet::parse("4\n8\nsizeof(long long) = ?\n8\n").unwrap_err();
        assert!(matches!(err, ConfigureError::MalformedSizeOutput { .. }));
    }

    #[test]
    fn test_zero_width_is_malformed() {
        let err = SizeSet::parse("4\n0\n8\n8\n").unwrap_err();
        assert!(matches!(err, ConfigureError::MalformedSizeOutput { .. }));
    }

    #[test]
    fn test_from_values_checks_count() {
        assert!(SizeSet::from_values(&[4, 8, 8]).is_err());
        assert!(SizeSet::from_values(&[4, 8, 8, 8]).is_ok());
    }

    #[test]
    fn test_builtin_source_prints_four_sizes() {
        assert_eq!(SIZE_PROBE_SOURCE.matches("printf(").count(), SIZE_COUNT);
    }

    #[test]
    fn test_find_probe_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(find_probe_source(tmp.path(), Path::new("sizes.c")).is_none());

        std::fs::write(tmp.path().join("sizes.c"), SIZE_PROBE_SOURCE).unwrap();
        assert_eq!(
            find_probe_source(tmp.path(), Path::new("sizes.c")),
            Some(tmp.path().join("sizes.c"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_fake_compiler() {
        use std::os::unix::fs::PermissionsExt;

        // The fake compiler writes a script to the -o path that prints sizes.
        let tmp = tempfile::TempDir::new().unwrap();
        let cc = tmp.path().join("cc");
        std::fs::write(
            &cc,
            "#!/bin/sh\nout=\"\"\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-o\" ]; then out=\"$2\"; shift; fi\n  shift\ndone\nprintf '#!/bin/sh\\necho \"sizeof(int) = 4\"\\necho \"sizeof(long) = 8\"\\necho \"sizeof(long long) = 8\"\\necho \"sizeof(size_t) = 8\"\\n' > \"$out\"\nchmod +x \"$out\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&cc, std::fs::Permissions::from_mode(0o755)).unwrap();

        let sizes = SizeProbe::new(&cc)
            .with_timeout(Some(Duration::from_secs(30)))
            .run()
            .unwrap();

        assert_eq!(sizes.as_array(), [4, 8, 8, 8]);
    }
}
