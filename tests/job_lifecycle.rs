use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use tool_job_config::job::Job;
use tool_job_config::manager::JobOptions;
use tool_job_config::report::{JobOutcome, ParameterSummary, ResultData, ResultReporter};
use tool_job_config::types::InputFiles;
use tool_job_config::ConfigError;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("tool-job-config-job-{nanos}-{n}.{ext}"))
}

fn stage(fixture: &str) -> PathBuf {
    let src = Path::new("tests/fixtures").join(fixture);
    let dst = tmp_file("json");
    std::fs::copy(&src, &dst).unwrap();
    dst
}

#[derive(Default)]
struct RecordingReporter {
    statuses: Mutex<Vec<String>>,
    outcomes: Mutex<Vec<JobOutcome>>,
}

impl ResultReporter for RecordingReporter {
    fn update_status(&self, message: &str) {
        self.statuses.lock().unwrap().push(message.to_string());
    }

    fn update_results(&self, outcome: JobOutcome) {
        self.outcomes.lock().unwrap().push(outcome);
    }
}

#[test]
fn close_deletes_every_registered_file() {
    let config = stage("config.json");
    let data = stage("power.geojson");
    let files = InputFiles::new()
        .with_path("config", &config)
        .with_path("computation", &data);
    let mut job = Job::new(files, JobOptions::default());
    job.load().unwrap();

    let report = job.close();
    assert!(report.is_clean());
    assert_eq!(report.removed, vec![config.clone(), data.clone()]);
    assert!(!config.exists());
    assert!(!data.exists());
}

#[test]
fn drop_deletes_files_even_when_processing_fails() {
    let config = stage("config.json");
    let data = tmp_file("geojson");
    std::fs::write(&data, "not json").unwrap();
    let files = InputFiles::new()
        .with_path("config", &config)
        .with_path("computation", &data);

    let result: Result<usize, ConfigError> = Job::scope(files, JobOptions::default(), |cfg| {
        let set = cfg.get_features("computation")?;
        Ok(set.feature_count())
    });

    assert!(result.is_err());
    assert!(!config.exists());
    assert!(!data.exists());
}

#[test]
fn drop_deletes_files_when_unwinding() {
    let config = stage("config.json");
    let files = InputFiles::new().with_path("config", &config);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        Job::scope(files, JobOptions::default(), |_cfg| -> () {
            panic!("computation blew up");
        })
    }));

    assert!(outcome.is_err());
    assert!(!config.exists());
}

#[test]
fn unregistered_paths_are_untouched_and_missing_files_are_not_fatal() {
    let bystander = stage("config.json");
    let gone = tmp_file("json");
    let config = stage("config.json");
    let files = InputFiles::new()
        .with_path("config", &config)
        .with_path("computation", &gone)
        .with_path("again", &config);

    let report = Job::new(files, JobOptions::default()).close();
    assert_eq!(report.removed, vec![config.clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, gone);
    assert!(bystander.exists());
    std::fs::remove_file(&bystander).unwrap();
}

#[test]
fn missing_settings_key_fails_load_and_repeats_on_retry() {
    let files = InputFiles::new().with_path("config", stage("no_settings.json"));
    let mut job = Job::new(files, JobOptions::default());

    let err = job.load().unwrap_err();
    assert!(matches!(err, ConfigError::ConfigLoad { .. }));
    assert!(err.to_string().contains("No analysis settings"));
    assert!(!job.is_valid());
    assert_eq!(job.failures().len(), 1);

    assert!(job.load().is_err());
    assert_eq!(job.failures().len(), 2);
    assert!(job.get_parameters("computation").is_err());
}

fn load_inline_config(text: &str) -> (Job, ConfigError) {
    let config = tmp_file("json");
    std::fs::write(&config, text).unwrap();
    let mut job = Job::new(InputFiles::new().with_path("config", &config), JobOptions::default());
    let err = job.load().unwrap_err();
    (job, err)
}

#[test]
fn settings_that_are_not_a_mapping_fail_load() {
    let (job, err) = load_inline_config(r#"{"analysis settings": [1, 2]}"#);
    assert!(matches!(err, ConfigError::ConfigLoad { .. }));
    assert!(err.to_string().contains("is not a mapping"));
    assert_eq!(job.failures().len(), 1);
    assert!(!job.is_valid());
}

#[test]
fn empty_settings_mapping_fails_load() {
    let (job, err) = load_inline_config(r#"{"analysis settings": {}}"#);
    assert!(matches!(err, ConfigError::ConfigLoad { .. }));
    assert!(err.to_string().contains("No analysis settings"));
    assert_eq!(job.failures().len(), 1);
    assert!(!job.is_valid());
}

#[test]
fn unparseable_config_records_data_and_config_failures() {
    let config = tmp_file("json");
    std::fs::write(&config, "{ broken").unwrap();
    let mut job = Job::new(InputFiles::new().with_path("config", &config), JobOptions::default());

    assert!(job.load().is_err());
    let failures = job.failures().to_vec();
    assert_eq!(failures.len(), 2);
    assert!(failures[0].starts_with("data load error in namespace 'config'"));
    assert!(failures[1].contains("JSON load of posted job configuration failed"));
}

#[test]
fn missing_config_file_registration_is_config_load_error() {
    let mut job = Job::new(InputFiles::new(), JobOptions::default());
    let err = job.load().unwrap_err();
    assert!(matches!(err, ConfigError::ConfigLoad { .. }));
    assert!(!job.is_valid());
}

#[test]
fn custom_config_namespace_and_settings_key() {
    let path = tmp_file("json");
    std::fs::write(&path, r#"{"settings": {"page": {"x": {"value": 1}}}}"#).unwrap();
    let opts = JobOptions {
        config_namespace: "job".to_string(),
        settings_key: "settings".to_string(),
        ..Default::default()
    };
    let mut job = Job::new(InputFiles::new().with_path("job", &path), opts);
    assert_eq!(job.namespaces().unwrap(), vec!["page".to_string()]);
    assert!(job.has_namespace("page").unwrap());
    assert!(!job.has_namespace("other").unwrap());
    assert!(job.is_valid());
}

#[test]
fn unknown_namespace_is_recorded() {
    let mut job = Job::new(InputFiles::new().with_path("config", stage("config.json")), JobOptions::default());
    let err = job.get_features("nope").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownNamespace { .. }));
    assert_eq!(job.failures(), ["unknown namespace 'nope'".to_string()]);
}

#[test]
fn job_from_platform_registry() {
    let config = stage("config.json");
    let registry = json!({ "config": [config.to_str().unwrap(), "application/json"] });
    let mut job = Job::from_json(&registry, JobOptions::default()).unwrap();
    assert_eq!(job.datafile("config"), Some(config.as_path()));
    assert!(job.get_parameters("computation_params").is_ok());
    drop(job);
    assert!(!config.exists());
}

#[test]
fn report_sends_failures_without_files() {
    let mut job = Job::new(InputFiles::new().with_path("config", stage("config.json")), JobOptions::default());
    let params = job.get_parameters("computation_params").unwrap();
    job.fail("Cannot perform computations without input data");

    let reporter = RecordingReporter::default();
    let file = params.to_result_file("summary").unwrap();
    job.report(&reporter, Some("summary"), vec![file]);

    let outcomes = reporter.outcomes.lock().unwrap();
    assert_eq!(
        *outcomes,
        vec![JobOutcome::Failure {
            errors: vec!["Cannot perform computations without input data".to_string()]
        }]
    );
}

#[test]
fn report_before_load_sends_generic_invalid_message() {
    let job = Job::new(InputFiles::new().with_path("config", stage("config.json")), JobOptions::default());
    let reporter = RecordingReporter::default();
    job.report(&reporter, None, Vec::new());

    let outcomes = reporter.outcomes.lock().unwrap();
    assert_eq!(
        *outcomes,
        vec![JobOutcome::Failure {
            errors: vec!["Invalid job configuration".to_string()]
        }]
    );
}

#[test]
fn report_sends_result_files_when_valid() {
    let mut job = Job::new(InputFiles::new().with_path("config", stage("config.json")), JobOptions::default());
    let params = job.get_parameters("computation_params").unwrap();

    let mut summary = ParameterSummary::new();
    summary.section("compute");
    for (k, v) in params.iter() {
        summary.parameter("compute", k, v);
    }

    let reporter = RecordingReporter::default();
    reporter.update_status("Parameter & data file validation complete.");
    job.report(&reporter, Some("summary"), vec![summary.to_result_file("summary").unwrap()]);

    let outcomes = reporter.outcomes.lock().unwrap();
    match outcomes.as_slice() {
        [JobOutcome::Success { result_file, files }] => {
            assert_eq!(result_file.as_deref(), Some("summary"));
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].file_name, "summary.csv");
            assert!(files[0].content.contains("Parameter-compute-computetype,Both"));
        }
        other => panic!("unexpected outcomes: {other:?}"),
    }
    assert_eq!(reporter.statuses.lock().unwrap().len(), 1);
}
