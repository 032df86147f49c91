use anyhow::{ensure, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Files produced by a clustering run.
#[derive(Debug, PartialEq)]
pub struct ClusterOutputs {
    /// one representative sequence per cluster
    pub centroids: PathBuf,
    /// the `.uc` membership report
    pub membership: PathBuf,
}

impl ClusterOutputs {
    /// Output paths sit next to the input, named after its stem and the identity threshold,
    /// e.g. `reads.fa` at 0.97 gives `reads_0.97.fa` and `reads_0.97.uc`.
    pub fn for_input(input: &Path, identity: f64) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{stem}_{identity}");

        ClusterOutputs {
            centroids: input.with_file_name(format!("{name}.fa")),
            membership: input.with_file_name(format!("{name}.uc")),
        }
    }
}

/// An external tool which clusters the reads of a .fasta file.
pub trait ClusterTool {
    fn cluster(&self, input: &Path, identity: f64) -> Result<ClusterOutputs>;
}

/// Clusters with `usearch -cluster_fast`, sorting the input by length.
pub struct Usearch {
    pub executable: String,
}

impl Usearch {
    pub fn new(executable: &str) -> Self {
        Usearch {
            executable: executable.to_string(),
        }
    }

    fn command(&self, input: &Path, identity: f64, outputs: &ClusterOutputs) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-cluster_fast")
            .arg(input)
            .args(["-sort", "length", "-id", &identity.to_string()])
            .arg("-centroids")
            .arg(&outputs.centroids)
            .arg("-uc")
            .arg(&outputs.membership);
        cmd
    }
}

impl ClusterTool for Usearch {
    fn cluster(&self, input: &Path, identity: f64) -> Result<ClusterOutputs> {
        let outputs = ClusterOutputs::for_input(input, identity);
        let mut cmd = self.command(input, identity, &outputs);

        info!("Running {:?}", cmd);
        let status = cmd
            .status()
            .with_context(|| format!("Running {}", self.executable))?;

        ensure!(
            status.success(),
            "{} exited with {status}",
            self.executable
        );
        ensure!(
            outputs.membership.exists(),
            "{} finished, but did not write {}",
            self.executable,
            outputs.membership.display()
        );

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths() {
        let outputs = ClusterOutputs::for_input(Path::new("run/reads.fasta"), 0.97);
        assert_eq!(
            outputs,
            ClusterOutputs {
                centroids: PathBuf::from("run/reads_0.97.fa"),
                membership: PathBuf::from("run/reads_0.97.uc"),
            }
        );
    }

    #[test]
    fn usearch_arguments() {
        let tool = Usearch::new("usearch");
        let input = Path::new("reads.fa");
        let cmd = tool.command(input, 0.97, &ClusterOutputs::for_input(input, 0.97));

        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "-cluster_fast",
                "reads.fa",
                "-sort",
                "length",
                "-id",
                "0.97",
                "-centroids",
                "reads_0.97.fa",
                "-uc",
                "reads_0.97.uc"
            ]
        );
    }

    #[test]
    fn missing_executable() {
        let tool = Usearch::new("definitely-not-a-usearch-binary");
        let err = tool.cluster(Path::new("reads.fa"), 0.97).unwrap_err();
        assert!(err.to_string().contains("Running definitely-not-a-usearch-binary"));
    }
}
