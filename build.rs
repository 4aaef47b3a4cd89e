use std::fmt::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let samples_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/sample-outputs");
    println!("cargo:rerun-if-changed={samples_dir}");

    let mut paths = std::fs::read_dir(samples_dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, std::io::Error>>()?;
    paths.sort();

    // linux-route-v4.json => LINUX_ROUTE_V4
    let mut consts = String::new();
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let name = stem.replace(['-', '.'], "_").to_ascii_uppercase();
        let sample = std::fs::read_to_string(&path)?;
        writeln!(consts, "#[allow(dead_code)]")?;
        writeln!(consts, "const {name}: &str = {sample:?};")?;
    }

    let out_dir = std::env::var("OUT_DIR")?;
    std::fs::write(format!("{out_dir}/sample_outputs.rs"), consts.as_bytes())?;

    Ok(())
}
