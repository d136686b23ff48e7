//! Generates the static atom and named-character-reference tables consumed
//! by the tokenizer and tree constructor. Mirrors `markup5ever/build.rs`'s
//! `named_entities_to_phf`, but assigns small integer ids to the closed
//! atom sets (tag names, attribute names) instead of relying on a global
//! string-interning crate: see `src/atom.rs` for why.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Deserialize;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();

    let generated_path = Path::new(&out_dir).join("generated.rs");
    let mut out = BufWriter::new(File::create(&generated_path).unwrap());

    write_atom_table(
        &Path::new(&manifest_dir).join("data_tables").join("tags.txt"),
        "TAG_IDS",
        &mut out,
    );
    write_atom_table(
        &Path::new(&manifest_dir).join("data_tables").join("attrs.txt"),
        "ATTR_IDS",
        &mut out,
    );
    write_named_entities(
        &Path::new(&manifest_dir).join("data").join("entities.json"),
        &mut out,
    );

    println!("cargo:rerun-if-changed=data_tables/tags.txt");
    println!("cargo:rerun-if-changed=data_tables/attrs.txt");
    println!("cargo:rerun-if-changed=data/entities.json");
}

/// Assigns every distinct line of `path` a small sequential, nonzero id and
/// emits a `phf::Map<&'static str, u16>` named `name`. id 0 is reserved to
/// mean "not a member of this closed set" (see `Atom`).
fn write_atom_table(path: &Path, name: &str, out: &mut impl Write) {
    let mut ids: BTreeMap<String, u16> = BTreeMap::new();
    let mut next_id: u16 = 1;
    for line in BufReader::new(File::open(path).unwrap()).lines() {
        let line = line.unwrap();
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        ids.entry(line.to_string()).or_insert_with(|| {
            let id = next_id;
            next_id += 1;
            id
        });
    }

    let mut phf_map = phf_codegen::Map::new();
    for (text, id) in &ids {
        phf_map.entry(text.as_str(), &id.to_string());
    }
    writeln!(
        out,
        "pub static {name}: phf::Map<&'static str, u16> = {};",
        phf_map.build()
    )
    .unwrap();
    writeln!(out, "pub const {name}_LEN: u16 = {next_id};").unwrap();
}

#[derive(Deserialize, Debug)]
struct CharRefEntry {
    codepoints: Vec<u32>,
}

fn write_named_entities(path: &Path, out: &mut impl Write) {
    let entities: HashMap<String, CharRefEntry> =
        serde_json::from_reader(BufReader::new(File::open(path).unwrap())).unwrap();

    let mut table: HashMap<String, (u32, u32)> = entities
        .into_iter()
        .map(|(name, entry)| {
            assert!(name.starts_with('&'));
            let a = entry.codepoints[0];
            let b = *entry.codepoints.get(1).unwrap_or(&0);
            (name[1..].to_string(), (a, b))
        })
        .collect();

    // Every prefix of a name must also be present (possibly as the (0, 0)
    // sentinel) so the matcher's "can this prefix be extended" check never
    // needs to special-case a missing entry.
    for key in table.keys().cloned().collect::<Vec<_>>() {
        for n in 1..key.len() {
            table.entry(key[..n].to_string()).or_insert((0, 0));
        }
    }
    table.entry(String::new()).or_insert((0, 0));

    let mut phf_map = phf_codegen::Map::new();
    for (key, value) in &table {
        phf_map.entry(key.as_str(), &format!("({}, {})", value.0, value.1));
    }
    writeln!(
        out,
        "pub static NAMED_ENTITIES: phf::Map<&'static str, (u32, u32)> = {};",
        phf_map.build()
    )
    .unwrap();
}
