//! End-to-end runs over real files, a real SQLite store, and the merge
//! pass feeding a subsequent update.

use std::collections::BTreeSet;
use std::path::Path;

use treesnap_rs::hashing::to_hex;
use treesnap_rs::merge::merge_trees;
use treesnap_rs::node::{Atts, Node, ATT_KIND, ATT_SHA1, ATT_SIZE, KIND_FILE, ROOT_NAME};
use treesnap_rs::progress::NullMeter;
use treesnap_rs::store::{MemoryStore, SqliteStore};
use treesnap_rs::stream::VecSource;
use treesnap_rs::update::update_hashes;

const SHA1_ABC: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

fn atts(pairs: &[(&str, &str)]) -> Atts {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn enter_root() -> Node {
    Node::Enter {
        name: ROOT_NAME.into(),
        atts: Atts::new(),
    }
}

fn file(name: &str, pairs: &[(&str, &str)]) -> Node {
    Node::File {
        name: name.into(),
        atts: atts(pairs),
    }
}

fn write_files(dir: &Path, files: &[(&str, &[u8])]) {
    for (name, data) in files {
        std::fs::write(dir.join(name), data).unwrap();
    }
}

#[test]
fn single_file_first_run_writes_one_row() {
    let dir = tempfile::tempdir().unwrap();
    write_files(dir.path(), &[("a.txt", b"abc")]);

    let nodes = vec![
        enter_root(),
        Node::Sep,
        file(
            "a.txt",
            &[
                (ATT_KIND, KIND_FILE),
                (ATT_SIZE, "3"),
                ("ino", "10"),
                ("ctime", "100"),
            ],
        ),
        Node::Leave,
    ];

    let mut store = SqliteStore::open(&dir.path().join("hashes.db")).unwrap();
    let mut meter: Vec<String> = Vec::new();
    let stats = update_hashes(&mut store, VecSource::new(nodes), dir.path(), &mut meter, 1)
        .unwrap();

    assert_eq!(stats.hashed, 1);
    assert_eq!(stats.octets, 3);

    let rows = store.rows().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, 2);
    let digest: [u8; 20] = rows[0].1.as_slice().try_into().unwrap();
    assert_eq!(to_hex(&digest), SHA1_ABC);

    // Progress totals from the prescan: 1 file, 3 bytes.
    assert_eq!(
        meter.last().map(String::as_str),
        Some("  1/1 (100.0%) files, 3 B/3 B (100.0%) bytes")
    );
}

#[test]
fn non_file_kind_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();

    let nodes = vec![
        enter_root(),
        Node::Sep,
        file(
            "link",
            &[("kind", "lnk"), (ATT_SIZE, "0"), ("ino", "11"), ("ctime", "100")],
        ),
        Node::Leave,
    ];

    let mut store = SqliteStore::open_in_memory().unwrap();
    let mut meter: Vec<String> = Vec::new();
    let stats = update_hashes(&mut store, VecSource::new(nodes), dir.path(), &mut meter, 1)
        .unwrap();

    assert_eq!(stats.hashed, 0);
    assert_eq!(stats.failed, 0);
    assert!(store.rows().unwrap().is_empty());
    // No per-file meter redraw happened, only the final line.
    assert_eq!(meter.len(), 1);
}

#[test]
fn threaded_and_direct_agree_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let contents: Vec<(String, Vec<u8>)> = (0..32)
        .map(|i| (format!("file{i:02}"), vec![i as u8; 3 * i + 1]))
        .collect();
    for (name, data) in &contents {
        std::fs::write(dir.path().join(name), data).unwrap();
    }

    let nodes = || {
        let mut out = vec![enter_root(), Node::Sep];
        for (name, data) in &contents {
            out.push(file(
                name,
                &[(ATT_KIND, KIND_FILE), (ATT_SIZE, &data.len().to_string())],
            ));
        }
        out.push(Node::Leave);
        out
    };

    let mut direct = SqliteStore::open_in_memory().unwrap();
    update_hashes(
        &mut direct,
        VecSource::new(nodes()),
        dir.path(),
        &mut NullMeter,
        1,
    )
    .unwrap();

    let mut threaded = SqliteStore::open_in_memory().unwrap();
    update_hashes(
        &mut threaded,
        VecSource::new(nodes()),
        dir.path(),
        &mut NullMeter,
        4,
    )
    .unwrap();

    let direct_rows: BTreeSet<_> = direct.rows().unwrap().into_iter().collect();
    let threaded_rows: BTreeSet<_> = threaded.rows().unwrap().into_iter().collect();
    assert_eq!(direct_rows, threaded_rows);
    assert_eq!(direct_rows.len(), 32);
}

#[test]
fn merge_then_update_hashes_only_changed_files() {
    let dir = tempfile::tempdir().unwrap();
    write_files(dir.path(), &[("changed.txt", b"new body"), ("same.txt", b"abc")]);

    // The older generation has hashes for both files; the newer scan has
    // none. Only `same.txt` keeps its identity evidence.
    let older = vec![
        enter_root(),
        Node::Sep,
        file(
            "changed.txt",
            &[
                (ATT_KIND, KIND_FILE),
                (ATT_SIZE, "3"),
                ("ino", "7"),
                ("ctime", "50"),
                (ATT_SHA1, "0123456789abcdef0123456789abcdef01234567"),
            ],
        ),
        file(
            "same.txt",
            &[
                (ATT_KIND, KIND_FILE),
                (ATT_SIZE, "3"),
                ("ino", "8"),
                ("ctime", "60"),
                (ATT_SHA1, SHA1_ABC),
            ],
        ),
        Node::Leave,
    ];
    let latest = vec![
        enter_root(),
        Node::Sep,
        file(
            "changed.txt",
            &[
                (ATT_KIND, KIND_FILE),
                (ATT_SIZE, "8"),
                ("ino", "7"),
                ("ctime", "51"),
            ],
        ),
        file(
            "same.txt",
            &[
                (ATT_KIND, KIND_FILE),
                (ATT_SIZE, "3"),
                ("ino", "8"),
                ("ctime", "60"),
            ],
        ),
        Node::Leave,
    ];

    let mut merged = Vec::new();
    merge_trees(VecSource::new(older), VecSource::new(latest), &mut merged).unwrap();

    // same.txt kept its hash, so only changed.txt needs work.
    let mut store = MemoryStore::new();
    let stats = update_hashes(
        &mut store,
        VecSource::new(merged),
        dir.path(),
        &mut NullMeter,
        2,
    )
    .unwrap();

    assert_eq!(stats.hashed, 1);
    assert_eq!(store.rows().len(), 1);
    // Events: Enter(0), Sep(1), changed.txt(2), same.txt(3), Leave(4).
    assert_eq!(store.rows()[0].0, 2);
}
