//! End-to-end checks against the bundled FT-891 declarations in `conf/`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use catrig_cat::schema::OperationKind;
use catrig_cat::{Args, CatModel, CatRig, CatRigBuilder, ExecOptions, ModelRegistry, Value};
use catrig_core::Error;
use catrig_test_harness::{MockConnector, MockTransport};

fn registry_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../conf/support_model.yaml")
}

fn ft891() -> CatModel {
    ModelRegistry::load(&registry_path())
        .unwrap()
        .create("FT-891")
        .unwrap()
}

fn rig(connector: &MockConnector) -> CatRig {
    CatRigBuilder::new(ft891())
        .serial_port("/dev/ttyUSB0")
        .reconnect_delay(Duration::ZERO)
        .build_with_connector(Box::new(connector.clone()))
        .unwrap()
}

fn args(pairs: &[(&str, Value)]) -> Args {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect::<BTreeMap<_, _>>()
}

#[test]
fn registry_lists_ft891() {
    let registry = ModelRegistry::load(&registry_path()).unwrap();
    assert_eq!(registry.models().collect::<Vec<_>>(), vec!["FT-891"]);
}

#[test]
fn model_specific_document_overrides_base() {
    let model = ft891();
    let ops = &model.operations;
    // From the base document only.
    assert!(ops.contains("AF_GAIN_SET"));
    // From the FT-891 document only.
    assert!(ops.contains("IF_SHIFT_SET"));
    assert!(ops.contains("INFO_GET"));
    assert!(ops.names().all(|n| OperationKind::from_name(n).is_some()));
}

#[tokio::test]
async fn every_get_decodes_its_debug_reply() {
    let connector = MockConnector::new();
    let mut rig = rig(&connector);
    let gets: Vec<String> = rig
        .operations()
        .iter()
        .filter(|op| op.kind() == OperationKind::Get)
        .map(|op| op.name.clone())
        .collect();
    assert!(!gets.is_empty());

    for name in gets {
        let out = rig
            .execute(&name, &Args::new(), ExecOptions::debug())
            .await
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        let fields = out.into_fields().unwrap();
        assert!(!fields.is_empty(), "{name}");
        for (field, value) in fields.iter() {
            assert!(!value.is_unknown(), "{name}.{field} decoded to UNKNOWN");
        }
    }
    assert_eq!(connector.open_count(), 0);
}

#[tokio::test]
async fn debug_identity_comes_from_override() {
    let mut rig = rig(&MockConnector::new());
    let out = rig
        .execute("id", &Args::new(), ExecOptions::debug())
        .await
        .unwrap();
    assert_eq!(
        out.fields().unwrap().get("ID"),
        Some(&Value::Text("0650".into()))
    );
    let power = rig
        .execute("POWER_GET", &Args::new(), ExecOptions::debug())
        .await
        .unwrap();
    assert_eq!(power.fields().unwrap().get("WATTS"), Some(&Value::Int(50)));
}

#[tokio::test]
async fn info_reply_is_decoded_in_order() {
    let mock = MockTransport::new();
    mock.expect(b"IF;", b"IF000007074000-012010100000;");
    let mut rig = rig(&MockConnector::with_transport(mock.clone()));
    rig.connect().await.unwrap();

    let info = rig.get("INFO").await.unwrap();
    let names: Vec<&str> = info.iter().map(|(n, _)| n).collect();
    assert_eq!(
        names,
        vec![
            "MEMORY_CH",
            "FREQ",
            "CLAR_OFFSET",
            "RX_CLAR",
            "TX_CLAR",
            "MODE",
            "CH_TYPE",
            "TONE",
            "SHIFT"
        ]
    );
    assert_eq!(info.get("FREQ"), Some(&Value::Int(7_074_000)));
    assert_eq!(info.get("CLAR_OFFSET"), Some(&Value::Int(-120)));
    assert_eq!(info.get("RX_CLAR"), Some(&Value::Text("ON".into())));
    assert_eq!(info.get("TX_CLAR"), Some(&Value::Text("OFF".into())));
    assert_eq!(info.get("MODE"), Some(&Value::Text("LSB".into())));
}

#[tokio::test]
async fn tune_and_read_back() {
    let mock = MockTransport::new();
    mock.expect_write(b"FA007074000;");
    mock.expect_write(b"MD0C;");
    mock.expect_write(b"AG0064;");
    mock.expect(b"FA;", b"FA007074000;");
    let mut rig = rig(&MockConnector::with_transport(mock.clone()));

    // First use connects on demand. Short names need a suffix when both
    // kinds are declared.
    rig.set("VFO_A_FREQ_SET", &args(&[("FREQ", Value::Int(7_074_000))]))
        .await
        .unwrap();
    rig.set("mode_set", &args(&[("MODE", "DATA-USB".into())]))
        .await
        .unwrap();
    rig.set("af_gain_set", &args(&[("VAL", Value::Int(25))]))
        .await
        .unwrap();
    let freq = rig.get("VFO_A_FREQ_GET").await.unwrap();

    assert_eq!(freq.get("FREQ"), Some(&Value::Int(7_074_000)));
    assert_eq!(mock.remaining_expectations(), 0);
}

#[tokio::test]
async fn if_shift_with_two_placeholders() {
    let mock = MockTransport::new();
    mock.expect_write(b"IS0-0300;");
    let mut rig = rig(&MockConnector::with_transport(mock.clone()));
    rig.set(
        "IF_SHIFT_SET",
        &args(&[("DIRECTION", "MINUS".into()), ("OFFSET", Value::Int(300))]),
    )
    .await
    .unwrap();
    assert_eq!(mock.sent_data(), vec![b"IS0-0300;".to_vec()]);
}

#[tokio::test]
async fn short_form_mode_is_ambiguous() {
    let mut rig = rig(&MockConnector::new());
    let err = rig
        .execute("mode", &Args::new(), ExecOptions::debug())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AmbiguousOperation(ref n) if n == "MODE"));
}

#[tokio::test]
async fn band_without_code_is_no_mapping() {
    let mut rig = rig(&MockConnector::new());
    let err = rig
        .execute("BAND", &args(&[("BAND", "2M".into())]), ExecOptions::debug())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoMapping { .. }));
}
