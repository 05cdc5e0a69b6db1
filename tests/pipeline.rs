use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use sortwise::config::Config;
use sortwise::constants::MIN_LABEL_LEN;
use sortwise::embeddings::{EmbeddingProvider, HashingEmbeddingProvider};
use sortwise::llm::LlmProvider;
use sortwise::models::SortMode;
use sortwise::organizer::plan::is_safe_folder_name;
use sortwise::organizer::PlanOrigin;
use sortwise::pipeline::{
    ModelLoader, Orchestrator, PipelineEvent, PipelineRunner, PipelineState, Preloaded, RunOutcome,
    Unavailable,
};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::FileOptions;

fn config() -> Config {
    let mut config = Config::default();
    config.llm.provider = "disabled".to_string();
    config
}

fn hashing() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashingEmbeddingProvider::new(384))
}

fn orchestrator(config: Config, llm: Option<Arc<dyn LlmProvider>>) -> Arc<Orchestrator> {
    let generation: Arc<dyn ModelLoader<dyn LlmProvider>> = match llm {
        Some(model) => Arc::new(Preloaded::new(model, "scripted")),
        None => Arc::new(Unavailable::new("no generation model")),
    };
    Arc::new(Orchestrator::new(
        config,
        Arc::new(Preloaded::new(hashing(), "hashing")),
        generation,
    ))
}

async fn run(orchestrator: Arc<Orchestrator>, dir: &Path, mode: SortMode) -> (Vec<PipelineEvent>, RunOutcome) {
    let mut handle = PipelineRunner::new(orchestrator).spawn(dir, mode);
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        events.push(event);
    }
    let outcome = handle.wait().await;
    (events, outcome)
}

fn plan_of(outcome: &RunOutcome) -> &sortwise::OrganizationPlan {
    match outcome.plan() {
        Some(plan) => plan,
        None => panic!("expected a plan, got {:?}", outcome),
    }
}

fn write(dir: &TempDir, name: &str, content: &[u8]) {
    std::fs::write(dir.path().join(name), content).unwrap();
}

/// Plan sources are canonical; compare against the same form
fn at(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().canonicalize().unwrap().join(name)
}

fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn docx(text: &str) -> Vec<u8> {
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
        text
    );
    zip_with(&[("word/document.xml", &xml)])
}

/// Single-page PDF with one line of text
fn pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn xlsx(rows: &[&[&str]]) -> Vec<u8> {
    let mut shared = Vec::new();
    let mut sheet = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!("<row r=\"{}\">", r + 1));
        for value in row.iter() {
            sheet.push_str(&format!("<c t=\"s\"><v>{}</v></c>", shared.len()));
            shared.push(format!("<si><t>{}</t></si>", value));
        }
        sheet.push_str("</row>");
    }
    zip_with(&[
        ("xl/sharedStrings.xml", &format!("<sst>{}</sst>", shared.concat())),
        (
            "xl/worksheets/sheet1.xml",
            &format!("<worksheet><sheetData>{}</sheetData></worksheet>", sheet),
        ),
    ])
}

fn warnings(events: &[PipelineEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Warning { message, .. } => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

/// Answers every prompt with the same folder name
struct FixedNameModel(&'static str);

#[async_trait::async_trait]
impl LlmProvider for FixedNameModel {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(format!("Folder Name: {}", self.0))
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

/// Hashing embedder that counts how often it was loaded
struct CountingLoader {
    loads: AtomicUsize,
}

#[async_trait::async_trait]
impl ModelLoader<dyn EmbeddingProvider> for CountingLoader {
    async fn load(&self) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(hashing())
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

fn financial_and_hiking(dir: &TempDir) {
    write(
        dir,
        "invoice.pdf",
        &pdf("Quarterly invoice payment summary. Invoice total, revenue, budget, tax and expenses. Payment due."),
    );
    write(
        dir,
        "ledger.xlsx",
        &xlsx(&[
            &["Invoice", "Payment", "Revenue"],
            &["Budget", "Tax", "Expenses"],
            &["Invoice", "Payment", "Balance"],
        ]),
    );
    write(
        dir,
        "trip.txt",
        b"Hiking trail guide: mountain summit, forest camping, backpack gear and a trail map for the mountain hike.",
    );
}

#[tokio::test]
async fn test_related_documents_share_a_folder() {
    let dir = TempDir::new().unwrap();
    financial_and_hiking(&dir);
    let mut config = config();
    config.clustering.distance_threshold = 0.6;

    let (_, outcome) = run(Arc::new(Orchestrator::from_config(config)), dir.path(), SortMode::AiSemantic).await;
    let plan = plan_of(&outcome);

    let report = plan.folder_for(&at(&dir, "invoice.pdf")).unwrap();
    let ledger = plan.folder_for(&at(&dir, "ledger.xlsx")).unwrap();
    let trip = plan.folder_for(&at(&dir, "trip.txt")).unwrap();
    assert_eq!(report, ledger);
    assert_ne!(report, trip);
    let finance = ["Invoice", "Payment", "Budget", "Expenses", "Revenue", "Tax"];
    assert!(finance.iter().any(|t| report.contains(t)), "{}", report);
    assert_eq!(plan.stats().clusters, 2);
    assert!(plan
        .entries()
        .iter()
        .all(|e| matches!(e.origin, PlanOrigin::Cluster { .. })));
}

#[tokio::test]
async fn test_binary_only_never_loads_embedding_model() {
    let dir = TempDir::new().unwrap();
    write(&dir, "photo.png", b"\x89PNG\r\n\x1a\n....");
    write(&dir, "clip.mp4", &[0u8; 64]);
    let loader = Arc::new(CountingLoader {
        loads: AtomicUsize::new(0),
    });
    let orchestrator = Arc::new(Orchestrator::new(
        config(),
        loader.clone(),
        Arc::new(Unavailable::new("unused")),
    ));

    let (_, outcome) = run(orchestrator, dir.path(), SortMode::AiSemantic).await;
    let plan = plan_of(&outcome);

    assert_eq!(plan.folder_for(&at(&dir, "photo.png")), Some("Images"));
    assert_eq!(plan.folder_for(&at(&dir, "clip.mp4")), Some("Videos"));
    assert_eq!(plan.stats().clusters, 0);
    assert!(plan.entries().iter().all(|e| e.origin == PlanOrigin::Fallback));
    assert_eq!(loader.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_generation_model_uses_fallback_names() {
    let dir = TempDir::new().unwrap();
    financial_and_hiking(&dir);

    let (events, outcome) = run(orchestrator(config(), None), dir.path(), SortMode::AiSemantic).await;
    let plan = plan_of(&outcome);

    assert_eq!(plan.len(), 3);
    assert_eq!(plan.stats().generated_labels, 0);
    assert!(warnings(&events)
        .iter()
        .any(|w| w.contains("generation model unavailable")));
    for entry in plan.entries() {
        assert!(is_safe_folder_name(&entry.folder), "{}", entry.folder);
    }
}

#[tokio::test]
async fn test_required_generation_model_fails_run() {
    let dir = TempDir::new().unwrap();
    write(&dir, "notes.txt", b"meeting notes about the garden fence repair");
    let mut config = config();
    config.labeling.require_generation_model = true;

    let (_, outcome) = run(orchestrator(config, None), dir.path(), SortMode::AiSemantic).await;
    match outcome {
        RunOutcome::Failed { reason, .. } => assert_eq!(reason, "generation-model-unavailable"),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_embedding_model_failure_fails_run() {
    let dir = TempDir::new().unwrap();
    write(&dir, "notes.txt", b"meeting notes about the garden fence repair");
    let orchestrator = Arc::new(Orchestrator::new(
        config(),
        Arc::new(Unavailable::new("model file missing")),
        Arc::new(Unavailable::new("unused")),
    ));

    let (events, outcome) = run(orchestrator, dir.path(), SortMode::AiSemantic).await;
    match outcome {
        RunOutcome::Failed { reason, message } => {
            assert_eq!(reason, "embedding-model-unavailable");
            assert!(message.contains("model file missing"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::StateChanged {
            to: PipelineState::Failed,
            ..
        }
    )));
}

#[tokio::test]
async fn test_generated_names_are_unique() {
    let dir = TempDir::new().unwrap();
    financial_and_hiking(&dir);
    std::fs::create_dir(dir.path().join("Finance")).unwrap();
    let mut config = config();
    config.clustering.distance_threshold = 0.6;

    let (_, outcome) = run(
        orchestrator(config, Some(Arc::new(FixedNameModel("Finance")))),
        dir.path(),
        SortMode::AiSemantic,
    )
    .await;
    let plan = plan_of(&outcome);

    let folders: Vec<&str> = plan.by_folder().keys().copied().collect();
    assert_eq!(folders, vec!["Finance_2", "Finance_3"]);
    assert_eq!(plan.stats().generated_labels, 2);
}

#[tokio::test]
async fn test_short_and_broken_files_go_to_fallback() {
    let dir = TempDir::new().unwrap();
    write(&dir, "tiny.txt", b"hi");
    write(&dir, "broken.docx", b"this is not a zip archive");
    write(&dir, "essay.md", b"A long essay about the history of bread baking in small villages.");

    let (events, outcome) = run(orchestrator(config(), None), dir.path(), SortMode::AiSemantic).await;
    let plan = plan_of(&outcome);

    assert_eq!(plan.folder_for(&at(&dir, "tiny.txt")), Some("TXT_Files"));
    assert_eq!(plan.folder_for(&at(&dir, "broken.docx")), Some("DOCX_Files"));
    assert_eq!(plan.stats().failed, 1);
    assert_eq!(plan.stats().clustered, 1);
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::Warning { path: Some(p), .. } if p.ends_with("broken.docx")
    )));
}

#[tokio::test]
async fn test_every_file_planned_exactly_once() {
    let dir = TempDir::new().unwrap();
    financial_and_hiking(&dir);
    write(&dir, "photo.jpg", b"\xFF\xD8\xFF\xE0");
    write(&dir, "empty.txt", b"");
    write(&dir, "data.csv", b"city,population\nParis,2100000\nLyon,520000\n");
    write(&dir, "minutes.docx", &docx("Minutes of the garden club meeting about spring planting."));
    std::fs::create_dir(dir.path().join("Existing")).unwrap();

    let (_, outcome) = run(orchestrator(config(), None), dir.path(), SortMode::AiSemantic).await;
    let plan = plan_of(&outcome);

    let mut sources: Vec<_> = plan.entries().iter().map(|e| e.source.clone()).collect();
    sources.dedup();
    assert_eq!(sources.len(), 7);
    assert_eq!(plan.len(), 7);
    assert_eq!(plan.stats().files, 7);
    assert_eq!(plan.stats().clustered + plan.stats().fallback, 7);
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let dir = TempDir::new().unwrap();
    financial_and_hiking(&dir);
    write(&dir, "soup.txt", b"Tomato soup recipe with basil, garlic and olive oil.");

    let (_, first) = run(orchestrator(config(), None), dir.path(), SortMode::AiSemantic).await;
    let (_, second) = run(orchestrator(config(), None), dir.path(), SortMode::AiSemantic).await;

    assert_eq!(plan_of(&first).entries(), plan_of(&second).entries());
}

#[tokio::test]
async fn test_cancellation_stops_without_plan() {
    let dir = TempDir::new().unwrap();
    for i in 0..20 {
        write(
            &dir,
            &format!("note_{:02}.txt", i),
            format!("note number {} about weekly planning", i).as_bytes(),
        );
    }
    let mut config = config();
    config.pipeline.workers = 1;
    config.pipeline.event_buffer = 1;

    let mut handle = PipelineRunner::new(orchestrator(config, None)).spawn(dir.path(), SortMode::AiSemantic);
    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        if let PipelineEvent::Progress(p) = &event {
            if p.stage == PipelineState::Extracting && p.completed == 3 {
                handle.cancel();
            }
        }
        events.push(event);
    }

    assert!(matches!(events.last(), Some(PipelineEvent::Finished(RunOutcome::Cancelled))));
    assert!(!events.iter().any(|e| matches!(
        e,
        PipelineEvent::StateChanged {
            to: PipelineState::PlanReady,
            ..
        }
    )));
    let extracted = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::Progress(p) if p.stage == PipelineState::Extracting))
        .count();
    assert!(extracted < 20);
    assert!(handle.wait().await.is_cancelled());
}

#[tokio::test]
async fn test_missing_directory_fails_scan() {
    let dir = TempDir::new().unwrap();
    let (_, outcome) = run(
        orchestrator(config(), None),
        &dir.path().join("missing"),
        SortMode::AiSemantic,
    )
    .await;
    match outcome {
        RunOutcome::Failed { reason, .. } => assert_eq!(reason, "scan-failed"),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_config_fails_run() {
    let dir = TempDir::new().unwrap();
    let mut config = config();
    config.clustering.distance_threshold = -1.0;

    let (_, outcome) = run(orchestrator(config, None), dir.path(), SortMode::AiSemantic).await;
    match outcome {
        RunOutcome::Failed { reason, .. } => assert_eq!(reason, "invalid-config"),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_metadata_modes() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.txt", b"text");
    write(&dir, "b.PDF", b"%PDF-1.4");
    write(&dir, "README", b"no extension");

    let (events, outcome) = run(orchestrator(config(), None), dir.path(), SortMode::FileExtension).await;
    let plan = plan_of(&outcome);
    assert_eq!(plan.folder_for(&at(&dir, "a.txt")), Some("txt"));
    assert_eq!(plan.folder_for(&at(&dir, "b.PDF")), Some("pdf"));
    assert_eq!(plan.folder_for(&at(&dir, "README")), Some("no_extension"));
    assert!(plan.entries().iter().all(|e| e.origin == PlanOrigin::Metadata));
    let bucketed: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Progress(p) if p.stage == PipelineState::Labeling => Some(p.completed),
            _ => None,
        })
        .collect();
    assert_eq!(bucketed, vec![1, 2, 3]);
    assert!(!events.iter().any(|e| matches!(
        e,
        PipelineEvent::StateChanged {
            to: PipelineState::Embedding,
            ..
        }
    )));

    let (_, outcome) = run(orchestrator(config(), None), dir.path(), SortMode::DateModified).await;
    let plan = plan_of(&outcome);
    for entry in plan.entries() {
        let folder = entry.folder.as_bytes();
        assert_eq!(folder.len(), 7, "{}", entry.folder);
        assert_eq!(folder[4], b'-');
    }
}

#[tokio::test]
async fn test_device_name_extension_gets_safe_folder() {
    let dir = TempDir::new().unwrap();
    write(&dir, "paper.aux", b"\\relax");
    write(&dir, "paper.tex", b"\\documentclass{article}");

    let (_, outcome) = run(orchestrator(config(), None), dir.path(), SortMode::FileExtension).await;
    let plan = plan_of(&outcome);

    assert_eq!(plan.folder_for(&at(&dir, "paper.aux")), Some("aux_files"));
    assert_eq!(plan.folder_for(&at(&dir, "paper.tex")), Some("tex"));
}

#[tokio::test]
async fn test_relative_directory_gives_absolute_sources() {
    let dir = tempfile::Builder::new().prefix("sortwise-rel").tempdir_in(".").unwrap();
    financial_and_hiking(&dir);
    let relative = Path::new(".").join(dir.path().file_name().unwrap());

    for mode in [SortMode::FileExtension, SortMode::AiSemantic] {
        let (_, outcome) = run(orchestrator(config(), None), &relative, mode).await;
        let plan = plan_of(&outcome);

        assert!(plan.base().is_absolute(), "{}", plan.base().display());
        assert_eq!(plan.len(), 3);
        assert!(plan.entries().iter().all(|e| e.source.is_absolute()));
        assert!(plan.folder_for(&at(&dir, "trip.txt")).is_some());
    }
}

#[tokio::test]
async fn test_folder_names_fit_shortest_label_len() {
    let dir = TempDir::new().unwrap();
    financial_and_hiking(&dir);
    write(&dir, "photo.png", b"\x89PNG\r\n\x1a\n....");
    write(&dir, "tiny.txt", b"hi");
    let mut config = config();
    config.labeling.max_label_len = MIN_LABEL_LEN;

    let models: [Option<Arc<dyn LlmProvider>>; 2] =
        [None, Some(Arc::new(FixedNameModel("Quarterly_Financial_Reports")))];
    for model in models {
        let (_, outcome) = run(orchestrator(config.clone(), model), dir.path(), SortMode::AiSemantic).await;
        let plan = plan_of(&outcome);

        assert_eq!(plan.len(), 5);
        for folder in plan.by_folder().keys() {
            assert!(folder.chars().count() <= MIN_LABEL_LEN, "{}", folder);
            assert!(is_safe_folder_name(folder), "{}", folder);
        }
    }

    config.labeling.max_label_len = 8;
    let (_, outcome) = run(orchestrator(config, None), dir.path(), SortMode::AiSemantic).await;
    match outcome {
        RunOutcome::Failed { reason, .. } => assert_eq!(reason, "invalid-config"),
        other => panic!("unexpected outcome {:?}", other),
    }
}
