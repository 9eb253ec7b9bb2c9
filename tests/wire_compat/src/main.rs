fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use lanxfer_protocol::{
        ErrorKind, Phase, ProgressEvent, TransferMetadata, TransferOutcome, sanitize_name,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_bytes(name: &str) -> Vec<u8> {
        let path = fixtures_dir().join(name);
        fs::read(&path).unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let data = load_bytes(name);
        serde_json::from_slice(&data).unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Normalizes JSON numbers so that `50` and `50.0` compare equal.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => serde_json::json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture, re-serializes it, and compares the JSON values.
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
        parsed
    }

    // --- Header frames ---

    #[test]
    fn header_encodes_byte_exact() {
        let frame = TransferMetadata::new("report.pdf", 10_485_760).encode().unwrap();
        assert_eq!(frame, load_bytes("header_report_pdf.bin"));
    }

    #[test]
    fn header_parses_fixture() {
        let bytes = load_bytes("header_report_pdf.bin");
        let parsed = TransferMetadata::parse(&bytes).unwrap();
        assert_eq!(parsed.metadata, TransferMetadata::new("report.pdf", 10_485_760));
        assert!(parsed.leftover.is_empty());
    }

    #[test]
    fn header_unicode_name_is_utf8() {
        let bytes = load_bytes("header_unicode.bin");
        let parsed = TransferMetadata::parse(&bytes).unwrap();
        assert_eq!(parsed.metadata.name, "informe_año.txt");
        assert_eq!(parsed.metadata.size, 42);
        assert_eq!(
            TransferMetadata::new("informe_año.txt", 42).encode().unwrap(),
            bytes
        );
    }

    #[test]
    fn header_empty_file() {
        let bytes = load_bytes("header_empty.bin");
        let parsed = TransferMetadata::parse(&bytes).unwrap();
        assert_eq!(parsed.metadata.size, 0);
        assert_eq!(sanitize_name(&parsed.metadata.name), Some("empty.log"));
    }

    #[test]
    fn header_with_trailing_payload() {
        let mut bytes = load_bytes("header_report_pdf.bin");
        bytes.extend_from_slice(b"%PDF-1.7");
        let parsed = TransferMetadata::parse(&bytes).unwrap();
        assert_eq!(parsed.metadata.size, 10_485_760);
        assert_eq!(parsed.leftover, b"%PDF-1.7");
    }

    // --- Event JSON shapes ---

    #[test]
    fn fixture_progress_connecting() {
        let evt: ProgressEvent = roundtrip_test("progress_connecting.json");
        assert_eq!(evt.phase, Phase::Connecting);
        assert!(evt.percent.is_none());
    }

    #[test]
    fn fixture_progress_transferring() {
        let evt: ProgressEvent = roundtrip_test("progress_transferring.json");
        assert_eq!(evt.percent, Some(50.0));
    }

    #[test]
    fn fixture_outcome_success() {
        let outcome: TransferOutcome = roundtrip_test("outcome_success.json");
        assert!(outcome.is_success());
    }

    #[test]
    fn fixture_outcome_failure() {
        let outcome: TransferOutcome = roundtrip_test("outcome_failure.json");
        assert_eq!(
            outcome,
            TransferOutcome::Failure {
                kind: ErrorKind::ConnectionDropped,
                message: "connection closed after 40 of 100 bytes".into(),
            }
        );
    }
}
