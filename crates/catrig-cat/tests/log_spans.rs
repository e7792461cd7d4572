//! Every engine event is emitted under the span of the model load or rig it
//! belongs to.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use catrig_cat::{
    Args, CatModel, CatRigBuilder, ExecOptions, ModelRegistry, PlaceholderPolicy, ProtocolKind,
};
use catrig_test_harness::MockConnector;
use tracing::subscriber::DefaultGuard;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn capture() -> (Capture, DefaultGuard) {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}

fn assert_all_under(lines: &[String], span: &str) {
    assert!(!lines.is_empty());
    for line in lines {
        assert!(line.contains(span), "event outside {span}: {line}");
    }
}

#[test]
fn rejected_declarations_log_under_load_span() {
    let (log, _guard) = capture();
    let result = CatModel::from_documents(
        "TEST",
        ProtocolKind::YaesuCat,
        &["FA_SET: { CMD: \"FA{$FREQ-1};\" }\nAG_SET: { CMD: \"AG0\" }\n"],
        PlaceholderPolicy::Strict,
    );
    assert!(result.is_err());

    let lines = log.lines();
    assert!(lines.iter().any(|l| l.contains("Rejected operation declaration")));
    assert_all_under(&lines, "load{model=TEST}");
}

#[test]
fn registry_create_logs_under_load_span() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../conf/support_model.yaml");
    let registry = ModelRegistry::load(&path).unwrap();

    let (log, _guard) = capture();
    registry.create("FT-891").unwrap();

    let lines = log.lines();
    assert!(lines.iter().any(|l| l.contains("Model created")));
    assert_all_under(&lines, "load{model=FT-891}");
}

#[tokio::test]
async fn decoded_fields_log_under_rig_span() {
    let (log, _guard) = capture();
    let model = CatModel::from_documents(
        "TEST",
        ProtocolKind::YaesuCat,
        &["FA_GET: { CMD: \"FA;\", RET: { FREQ: \"2,11\" }, DEBUG: \"FA014250000\" }\n"],
        PlaceholderPolicy::Strict,
    )
    .unwrap();
    let mut rig = CatRigBuilder::new(model)
        .build_with_connector(Box::new(MockConnector::new()))
        .unwrap();
    let before = log.lines().len();

    rig.execute("FA_GET", &Args::new(), ExecOptions::debug())
        .await
        .unwrap();

    let lines = log.lines().split_off(before);
    assert!(lines.iter().any(|l| l.contains("Decoded")));
    assert_all_under(&lines, "rig{model=TEST}");
}
