use crate::build_utils::CommandLine;
use crate::config::{ClientArgs, NetworkConfig};
use crate::execution_client::{GenericExecutionClient, InitStep};
use std::path::{Path, PathBuf};

/*
 * Geth-specific Implementation for GenericExecutionClient
 */

#[derive(Debug, Clone, Copy, Default)]
pub struct Geth;

impl Geth {
    /// Flags shared by every invocation.
    fn base_command(binary: &Path, datadir: &Path, args: &ClientArgs) -> CommandLine {
        let mut command = CommandLine::new(binary);
        if args.fakepow {
            command = command.arg("--fakepow");
        }
        command
            .arg(format!("--datadir={}", datadir.display()))
            .arg(format!("--verbosity={}", args.log_level.verbosity()))
    }
}

impl GenericExecutionClient for Geth {
    fn name(&self) -> &'static str {
        "geth"
    }

    fn build_command(&self, client_path: &Path) -> CommandLine {
        CommandLine::new("go")
            .arg("run")
            .arg("build/ci.go")
            .arg("install")
            .arg("./cmd/geth")
            .current_dir(client_path)
    }

    fn binary_path(&self, client_path: &Path) -> PathBuf {
        client_path.join("build").join("bin").join("geth")
    }

    fn init_commands(
        &self,
        binary: &Path,
        datadir: &Path,
        args: &ClientArgs,
    ) -> Vec<(InitStep, CommandLine)> {
        vec![
            (
                InitStep::Init,
                Self::base_command(binary, datadir, args)
                    .arg("init")
                    .arg(args.genesis_path.display().to_string()),
            ),
            (
                InitStep::Import,
                Self::base_command(binary, datadir, args)
                    .arg("import")
                    .arg(args.chain_path.display().to_string()),
            ),
        ]
    }

    fn start_command(
        &self,
        binary: &Path,
        datadir: &Path,
        args: &ClientArgs,
        network: &NetworkConfig,
    ) -> CommandLine {
        Self::base_command(binary, datadir, args)
            .arg(format!("--port={}", network.listen_port))
            .arg("--nodiscover")
            .arg("--maxpeers=0")
            .arg("--http")
            .arg(format!("--http.api={}", network.http_api.join(",")))
            .arg(format!("--http.addr={}", network.http_address))
            .arg(format!("--http.port={}", network.http_port))
    }
}
