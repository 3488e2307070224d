use pipebridge_codec::MAX_FRAME_PAYLOAD;
use pipebridge_session::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT};
use pipebridge_transport::DEFAULT_ENDPOINT;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("pipebridge {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: pipebridge");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("PIPEBRIDGE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "transport: {}",
        if cfg!(windows) { "named-pipe" } else { "unix-domain-socket" }
    );
    println!("default_endpoint: {DEFAULT_ENDPOINT}");
    println!("connect_timeout: {DEFAULT_CONNECT_TIMEOUT:?}");
    println!("io_timeout: {DEFAULT_IO_TIMEOUT:?}");
    println!("max_frame_payload: {MAX_FRAME_PAYLOAD}");
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));

    Ok(SUCCESS)
}
