use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();

    generate_sub_profession_map(&out_dir);

    println!("cargo:rerun-if-changed=data/sub_professions.csv");
}

fn generate_sub_profession_map(out_dir: &str) {
    let csv = fs::read_to_string("data/sub_professions.csv")
        .expect("failed to read sub_professions.csv");

    // BTreeMap for deterministic output (sorted by key)
    let mut entries = BTreeMap::new();
    for line in csv.lines().skip(1) {
        let mut fields = line.splitn(2, ',');
        let (Some(id), Some(name)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Ok(id) = id.trim().parse::<u64>() else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        entries.entry(id).or_insert_with(|| name.to_string());
    }

    let path = Path::new(out_dir).join("sub_professions.rs");
    let mut file = BufWriter::new(fs::File::create(&path).unwrap());

    let mut builder = phf_codegen::Map::new();
    let quoted: Vec<_> = entries.iter().map(|(id, name)| (*id, format!("{:?}", name))).collect();
    for (id, name) in &quoted {
        builder.entry(*id, name);
    }

    writeln!(
        file,
        "pub static SUB_PROFESSIONS: phf::Map<u64, &'static str> = {};",
        builder.build()
    )
    .unwrap();
}
