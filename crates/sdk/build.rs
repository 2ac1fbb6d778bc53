use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rev = fs::read_to_string("../../abi/matching_engine/REVISION")?;
    println!("cargo::rustc-env=MATCHING_ENGINE_REVISION={}", rev.trim());
    println!("cargo::rerun-if-changed=../../abi");
    Ok(())
}
