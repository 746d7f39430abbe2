use anyhow::Result;
use std::env;

use vergen_gix::{BuildBuilder, Emitter, GixBuilder, RustcBuilder};
fn main() -> Result<()> {
    let build = BuildBuilder::all_build()?;
    let gitcl = GixBuilder::all_git()?;
    let rustc = RustcBuilder::all_rustc()?;
    Emitter::default()
        .add_instructions(&build)?
        .add_instructions(&gitcl)?
        .add_instructions(&rustc)?
        .emit()?;

    // Settings baked into the image; NVS values take precedence at runtime.
    for key in [
        "AUTICARE_WIFI_SSID",
        "AUTICARE_WIFI_PASSWORD",
        "AUTICARE_API_URL",
        "AUTICARE_DEVICE_ID",
    ] {
        println!("cargo:rerun-if-env-changed={key}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
    Ok(())
}
