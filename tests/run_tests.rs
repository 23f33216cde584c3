// tests/run_tests.rs

mod common;

use approx::assert_relative_eq;
use common::{target_data, ExactSampler, ProductModel};
use qsr::{BasisSet, LocalOperator, Qsr, QsrConfig, QsrError, Sgd, WaveFunction};

fn driver() -> Result<Qsr<ExactSampler, Sgd>, QsrError> {
    let (samples, bases) = target_data(&ProductModel::from_real(&[0.5, -0.2, 0.0]), 60, 2);
    let sampler = ExactSampler::new(ProductModel::from_real(&[0.0, 0.0, 0.0]), 8);
    let mut qsr = Qsr::new(sampler, Sgd::new(0.05), BasisSet::new(), samples, bases, QsrConfig::new(10, 30))?;
    qsr.add_observable("SigmaZ", LocalOperator::sigma_z_sum(3));
    qsr.add_observable("SigmaX", LocalOperator::sigma_x_sum(3));
    Ok(qsr)
}

#[test]
fn test_run_writes_log_and_parameters() -> Result<(), QsrError> {
    let dir = tempfile::tempdir()?;
    let prefix = dir.path().join("reconstruction");
    let mut qsr = driver()?;

    qsr.run(&prefix, 10, 3, 5)?;
    assert_eq!(qsr.step_count(), 10);

    let log: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(dir.path().join("reconstruction.log"))?)?;
    let output = log["Output"].as_array().expect("Output array");
    let iterations: Vec<u64> = output.iter().filter_map(|entry| entry["Iteration"].as_u64()).collect();
    assert_eq!(iterations, vec![3, 6, 9, 10]);
    for entry in output {
        assert_eq!(entry["SigmaZ"]["NSamples"], 30);
        assert!(entry["SigmaX"]["Mean"].is_number());
    }

    // The last snapshot (step 10) holds the final parameters.
    let wf: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(dir.path().join("reconstruction.wf"))?)?;
    let saved: Vec<(f64, f64)> = wf["parameters"]
        .as_array()
        .expect("parameters array")
        .iter()
        .filter_map(|p| Some((p[0].as_f64()?, p[1].as_f64()?)))
        .collect();
    let current = qsr.machine().parameters();
    assert_eq!(saved.len(), current.len());
    for ((re, im), p) in saved.iter().zip(&current) {
        assert_relative_eq!(*re, p.re, epsilon = 1e-12);
        assert_relative_eq!(*im, p.im, epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn test_run_continues_from_current_step() -> Result<(), QsrError> {
    let dir = tempfile::tempdir()?;
    let prefix = dir.path().join("resumed");
    let mut qsr = driver()?;
    qsr.advance(4)?;

    qsr.run(&prefix, 4, 2, 0)?;
    assert_eq!(qsr.step_count(), 8);

    let log: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(dir.path().join("resumed.log"))?)?;
    let iterations: Vec<u64> = log["Output"]
        .as_array()
        .expect("Output array")
        .iter()
        .filter_map(|entry| entry["Iteration"].as_u64())
        .collect();
    assert_eq!(iterations, vec![6, 8]);
    // Snapshots disabled.
    assert!(!dir.path().join("resumed.wf").exists());
    Ok(())
}

#[test]
fn test_run_into_missing_directory_is_a_persistence_error() -> Result<(), QsrError> {
    let dir = tempfile::tempdir()?;
    let prefix = dir.path().join("no/such/dir/run");
    let mut qsr = driver()?;

    let err = qsr.run(&prefix, 2, 1, 0).unwrap_err();
    assert!(matches!(err.root(), QsrError::Persistence { .. }), "got {:?}", err);
    // The step itself completed before the log write failed.
    assert_eq!(qsr.step_count(), 1);
    Ok(())
}
