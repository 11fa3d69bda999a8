//! Scan a corpus on disk, reconcile it, persist the ledger and do it again.

use std::path::Path;

use finledger_core::{AliasTable, EngineConfig, InstitutionKey, Reconciler};
use finledger_store::{CorpusLayout, load_ledger, load_registry_or_empty, save_ledger, scan_corpus};
use tempfile::TempDir;

const REGISTRY: &str = "\
identifier,name,country
10000291,Anglia Ruskin University,England
10007850,University of Bath,England
10005553,Royal Holloway and Bedford New College,England
";

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"%PDF-1.4").unwrap();
}

fn seed(dir: &TempDir) -> CorpusLayout {
    let layout = CorpusLayout::under(dir.path());
    let docs = &layout.documents_dir;
    let extracts = layout.extracts_dir.clone().unwrap();

    touch(&docs.join("Anglia_Ruskin_University_annual-report-2022-23.pdf"));
    touch(&docs.join("Anglia_Ruskin_2021-22.pdf"));
    touch(&docs.join("University_of_Bath_accounts1920.pdf"));
    touch(&docs.join("Royal_Holloway_FS_2020-21.pdf"));
    touch(&docs.join("Mystery_Polytechnic_2020.pdf"));
    touch(&docs.join("2019_annual_report.pdf"));
    touch(&extracts.join("Anglia_Ruskin_2021-22.txt"));
    touch(&extracts.join("University_of_Bath_2020-21.json"));

    std::fs::write(dir.path().join("registry.csv"), REGISTRY).unwrap();
    layout
}

#[test]
fn reconcile_persist_and_rerun_is_stable() {
    let dir = TempDir::new().unwrap();
    let layout = seed(&dir);
    let ledger_path = dir.path().join("ledger.csv");
    let config = EngineConfig::default();
    let registry = load_registry_or_empty(&dir.path().join("registry.csv"), AliasTable::builtin());
    let reconciler = Reconciler::new(&registry, &config);

    let corpus = scan_corpus(&layout).unwrap();
    assert_eq!(corpus.len(), 7);

    let mut ledger = load_ledger(&ledger_path).unwrap();
    let first = reconciler.reconcile(&mut ledger, &corpus, 2024, "2024-06-01T12:00:00+00:00");
    save_ledger(&ledger_path, &ledger).unwrap();

    assert_eq!(first.skipped.len(), 1, "{:?}", first.skipped);
    assert!(first.unmatched.contains("Mystery Polytechnic"));

    let anglia = first.coverage.get(&InstitutionKey::Id("10000291".into())).unwrap();
    assert_eq!(anglia.known.iter().copied().collect::<Vec<_>>(), vec![2021, 2022]);
    assert_eq!(anglia.documents, 2);

    let holloway = first.coverage.get(&InstitutionKey::Id("10005553".into())).unwrap();
    assert_eq!(holloway.known.iter().copied().collect::<Vec<_>>(), vec![2020]);

    let bath = first.coverage.get(&InstitutionKey::Id("10007850".into())).unwrap();
    assert_eq!(bath.known.iter().copied().collect::<Vec<_>>(), vec![2019, 2020]);

    let reloaded = load_ledger(&ledger_path).unwrap();
    assert_eq!(reloaded, ledger);

    let mut again = reloaded;
    let second = reconciler.reconcile(&mut again, &scan_corpus(&layout).unwrap(), 2024, "2024-07-01T08:00:00+00:00");
    assert_eq!(second.inserted(), 0);
    assert_eq!(second.updated(), 0);
    assert_eq!(second.placeholders_added, 0);
    assert_eq!(again, ledger);
}

#[test]
fn extract_pairs_onto_its_document_record() {
    let dir = TempDir::new().unwrap();
    let layout = seed(&dir);
    let config = EngineConfig::default();
    let registry = load_registry_or_empty(&dir.path().join("registry.csv"), AliasTable::builtin());

    let mut ledger = load_ledger(&dir.path().join("ledger.csv")).unwrap();
    Reconciler::new(&registry, &config).reconcile(&mut ledger, &scan_corpus(&layout).unwrap(), 2024, "t");

    let record = ledger
        .records()
        .iter()
        .find(|r| r.document_path.as_deref() == Some("documents/Anglia_Ruskin_2021-22.pdf"))
        .unwrap();
    assert_eq!(record.text_extract_path.as_deref(), Some("extracts/Anglia_Ruskin_2021-22.txt"));
    assert_eq!(record.period_end.to_string(), "2022");
}

#[test]
fn missing_registry_still_reconciles_by_name() {
    let dir = TempDir::new().unwrap();
    let layout = seed(&dir);
    let config = EngineConfig::default();
    let registry = load_registry_or_empty(&dir.path().join("no-such-registry.csv"), AliasTable::builtin());

    let mut ledger = load_ledger(&dir.path().join("ledger.csv")).unwrap();
    let result =
        Reconciler::new(&registry, &config).reconcile(&mut ledger, &scan_corpus(&layout).unwrap(), 2024, "t");

    assert!(registry.is_empty());
    assert!(ledger.records().iter().all(|r| r.institution_identifier.is_none()));
    assert!(result.unmatched.contains("Anglia Ruskin University"));
    assert!(result.unmatched.contains("Anglia Ruskin"));
}
