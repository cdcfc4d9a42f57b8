//! Sample Client Generator
//!
//! Generates random bank clients from the feature schema and runs them
//! through a locally loaded model, logging the messages a form user would see.

use rand::rngs::ThreadRng;
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;
use term_deposit_predictor::{
    assembler::AssemblerOptions,
    models::{InferenceEngine, ModelLoader},
    presenter::present_result,
    schema::{FeatureKind, FeatureSchema},
    ClientRecord, FieldValue, Label,
};
use tracing::{info, warn};

/// Random client generator driven by the feature schema
struct ClientGenerator {
    rng: ThreadRng,
    schema: FeatureSchema,
}

impl ClientGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            schema: FeatureSchema::bank_marketing(),
        }
    }

    /// Every attribute drawn uniformly from its widget range or choices
    fn generate_typical(&mut self) -> ClientRecord {
        let mut record = ClientRecord::new();
        for spec in self.schema.features() {
            let value = match &spec.kind {
                FeatureKind::Numeric { min, max, integer } => {
                    let v = self.rng.gen_range(*min..=*max);
                    FieldValue::Number(if *integer { v.round() } else { round3(v) })
                }
                FeatureKind::Categorical { choices } => {
                    FieldValue::Text(choices[self.rng.gen_range(0..choices.len())].to_string())
                }
            };
            record.insert(spec.name, value);
        }
        record
    }

    /// A client with the traits that usually precede a subscription
    fn generate_promising(&mut self) -> ClientRecord {
        let mut record = self.generate_typical();
        record.insert("duration", FieldValue::Number(self.rng.gen_range(500..1500) as f64));
        record.insert("poutcome", FieldValue::Text("success".into()));
        record.insert("contact", FieldValue::Text("cellular".into()));
        record.insert("pdays", FieldValue::Number(self.rng.gen_range(0..15) as f64));
        record.insert("euribor3m", FieldValue::Number(round3(self.rng.gen_range(0.6..1.5))));
        record.insert("nr.employed", FieldValue::Number(round3(self.rng.gen_range(4960.0..5100.0))));
        record
    }
}

/// Share of promising clients; must be a probability for `gen_bool`
fn parse_rate(arg: Option<&str>, default: f64) -> anyhow::Result<f64> {
    let rate = match arg {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|e| anyhow::anyhow!("invalid promising rate '{}': {}", raw, e))?,
        None => default,
    };
    if !(0.0..=1.0).contains(&rate) {
        anyhow::bail!("promising rate must be between 0 and 1, got {}", rate);
    }
    Ok(rate)
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_clients=info".parse()?),
        )
        .init();

    info!("Starting Sample Client Generator");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let artifact = PathBuf::from(
        args.get(1)
            .map(|s| s.as_str())
            .unwrap_or("models/bank_decision_tree.json"),
    );
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
    let promising_rate = parse_rate(args.get(3).map(|s| s.as_str()), 0.2)?;
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);

    info!(
        artifact = %artifact.display(),
        count = count,
        promising_rate = promising_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let model = match ModelLoader::new().load(&artifact) {
        Ok(model) => model,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Failed to load model. Running in dry-run mode.");
            return run_dry_mode(count, promising_rate).await;
        }
    };
    let engine = InferenceEngine::from_model(model, AssemblerOptions::default());

    let mut generator = ClientGenerator::new();
    let mut rng = rand::thread_rng();
    let mut yes_count = 0;
    let mut no_count = 0;
    let mut failed_count = 0;

    for i in 0..count {
        let record = if rng.gen_bool(promising_rate) {
            generator.generate_promising()
        } else {
            generator.generate_typical()
        };

        let result = engine.predict_record(record);
        match &result {
            Ok(outcome) if outcome.label == Label::Yes => yes_count += 1,
            Ok(_) => no_count += 1,
            Err(_) => failed_count += 1,
        }

        for message in present_result(&result) {
            info!(client = i + 1, kind = ?message.kind, "{}", message.text);
        }

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    info!(
        "Completed! Scored {} clients ({} yes, {} no, {} failed)",
        count, yes_count, no_count, failed_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, promising_rate: f64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no model loaded)");

    let mut generator = ClientGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let record = if rng.gen_bool(promising_rate) {
            generator.generate_promising()
        } else {
            generator.generate_typical()
        };

        let json = serde_json::to_string_pretty(&record)?;
        info!("Sample client {}:\n{}", i + 1, json);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate(None, 0.2).unwrap(), 0.2);
        assert_eq!(parse_rate(Some("0.5"), 0.2).unwrap(), 0.5);
        assert!(parse_rate(Some("1.5"), 0.2).is_err());
        assert!(parse_rate(Some("-0.1"), 0.2).is_err());
        assert!(parse_rate(Some("NaN"), 0.2).is_err());
        assert!(parse_rate(Some("lots"), 0.2).is_err());
    }

    #[test]
    fn test_generated_clients_cover_schema() {
        let mut generator = ClientGenerator::new();
        let record = generator.generate_promising();

        assert_eq!(record.len(), 20);
        assert_eq!(record.get("poutcome"), Some(&FieldValue::Text("success".into())));
        assert!(record.iter().all(|(_, v)| !v.is_blank()));
    }
}
