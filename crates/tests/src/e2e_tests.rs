//! Full pipeline runs against the simulated toolkit

use std::fs;
use std::path::{Path, PathBuf};

use config_loader::{ConfigFormat, ConfigLoader};
use contracts::{Backend, BackendSelection, ContractError, PipelineSettings, Stage};
use coordinator::{Coordinator, CoordinatorError, RunRequest};
use preprocess::PreprocessOutcome;

use crate::simulated::{write_inputs, SimVolume, SimulatedToolkit};

const FLAIR_SPACING: [f64; 3] = [0.9375, 0.9375, 3.0];

fn inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let t1 = SimVolume::new("RAS", [1.0, 1.0, 1.0]);
    let flair = SimVolume::new("LPI", FLAIR_SPACING);
    write_inputs(dir, &t1, &flair).unwrap()
}

fn request(dir: &Path, selection: &[Backend], threads: usize) -> RunRequest {
    let (t1, flair) = inputs(dir);
    RunRequest {
        base_dir: dir.to_path_buf(),
        output_root: PathBuf::from("subject"),
        t1,
        flair,
        threads,
        selection: selection.iter().copied().collect(),
        fail_fast: false,
    }
}

fn root(dir: &Path) -> PathBuf {
    dir.join("subject")
}

fn published(dir: &Path, backend: Backend) -> SimVolume {
    SimVolume::load(&root(dir).join(format!("WMH_{backend}.nii"))).unwrap()
}

fn result_text(dir: &Path, backend: Backend) -> String {
    fs::read_to_string(root(dir).join(format!("WMH_{backend}.txt"))).unwrap()
}

#[tokio::test]
async fn test_lpa_end_to_end_with_four_threads() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new().with_result(
        Backend::Lpa,
        SimVolume::new("RPI", FLAIR_SPACING)
            .oblique()
            .with_voxel(0, 0, 0, 0.7)
            .with_voxel(1, 0, 0, 0.3),
    );
    let settings = PipelineSettings::default();

    let report = Coordinator::new(&toolkit, &settings)
        .run(&request(dir.path(), &[Backend::Lpa], 4))
        .await
        .unwrap();

    assert!(!report.has_failures());
    for name in ["FLAIR.nii.gz", "T1.nii.gz", "3DT1.nii.gz"] {
        assert!(root(dir.path()).join("proc/pre").join(name).is_file(), "{name}");
    }
    let pre = |name: &str| SimVolume::load(&root(dir.path()).join("proc/pre").join(name)).unwrap();
    assert_eq!(pre("3DT1.nii.gz").spacing, [1.0, 1.0, 1.0]);
    assert_eq!(pre("T1.nii.gz").spacing, FLAIR_SPACING);
    assert_eq!(pre("T1.nii.gz").orientation, "RPI");
    assert!(root(dir.path()).join("WMH_LPA.nii").exists());

    let text = result_text(dir.path(), Backend::Lpa);
    let mut lines = text.lines();
    let volume = lines
        .next()
        .and_then(|l| l.strip_prefix("WMH Volume: "))
        .and_then(|l| l.strip_suffix(" ml"))
        .unwrap();
    assert!(volume.parse::<f64>().is_ok());
    let minutes = lines
        .next()
        .and_then(|l| l.strip_prefix("Processing time: "))
        .and_then(|l| l.strip_suffix(" minutes"))
        .unwrap();
    assert!(minutes.parse::<u64>().is_ok());

    // threshold 0.5 keeps one voxel and the result is no longer oblique
    let mask = published(dir.path(), Backend::Lpa);
    assert_eq!(mask.nonzero(), 1);
    assert_eq!(mask.value(0, 0, 0), 1.0);

    for invocation in toolkit.invocations() {
        assert_eq!(invocation.env["OMP_NUM_THREADS"], "4");
        assert_eq!(invocation.env["ITK_GLOBAL_DEFAULT_NUMBER_OF_THREADS"], "4");
        assert!(invocation.working_dir.is_absolute());
    }
}

#[tokio::test]
async fn test_sysu_threshold_on_voxel_data() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new().with_result(
        Backend::Sysu,
        SimVolume::new("LPI", [1.0, 1.0, 1.0])
            .with_voxel(0, 0, 0, 0.9998)
            .with_voxel(1, 0, 0, 1.0)
            .with_voxel(2, 0, 0, 0.99995),
    );
    let settings = PipelineSettings::default();

    Coordinator::new(&toolkit, &settings)
        .run(&request(dir.path(), &[Backend::Sysu], 1))
        .await
        .unwrap();

    let mask = published(dir.path(), Backend::Sysu);
    assert_eq!(mask.value(0, 0, 0), 0.0);
    assert_eq!(mask.value(1, 0, 0), 1.0);
    assert_eq!(mask.value(2, 0, 0), 1.0);
    // reoriented to FLAIR, then carries FLAIR's geometry
    assert_eq!(mask.orientation, "RPI");
    assert_eq!(mask.spacing, FLAIR_SPACING);
}

#[tokio::test]
async fn test_fmrib_flip_moves_features() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new().with_result(
        Backend::Fmrib,
        SimVolume::new("LAS", [2.0, 2.0, 2.0]).with_voxel(3, 5, 2, 1.0),
    );
    let settings = PipelineSettings::default();

    Coordinator::new(&toolkit, &settings)
        .run(&request(dir.path(), &[Backend::Fmrib], 1))
        .await
        .unwrap();

    let mask = published(dir.path(), Backend::Fmrib);
    assert_eq!(mask.value(-3, -5, 2), 1.0);
    assert_eq!(mask.value(3, 5, 2), 0.0);
    assert_eq!(mask.orientation, "RPI");
    assert_eq!(mask.spacing, FLAIR_SPACING);
}

#[tokio::test]
async fn test_volume_arithmetic_in_result_files() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new()
        .with_result(Backend::Pgs, SimVolume::new("RPI", FLAIR_SPACING).with_lesion(1532));
    let settings = PipelineSettings::default();

    let report = Coordinator::new(&toolkit, &settings)
        .run(&request(dir.path(), &[Backend::Pgs], 2))
        .await
        .unwrap();

    // 1532 * 0.9375 * 0.9375 * 3 / 1000
    assert_eq!(
        result_text(dir.path(), Backend::Pgs),
        "WMH Volume: 4.039453 ml\nProcessing time: 0 minutes\n"
    );
    assert_eq!(
        fs::read_to_string(root(dir.path()).join("proc/seg/PGS/WMHvolume.txt")).unwrap(),
        "4.039453\n"
    );
    let record = report.outcome(Backend::Pgs).and_then(|o| o.record()).unwrap();
    assert!((record.volume_ml - 4.039453125).abs() < 1e-9);
}

#[tokio::test]
async fn test_do_all_publishes_every_backend() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new().with_result(
        Backend::WmhSynthSeg,
        SimVolume::new("RPI", FLAIR_SPACING)
            .with_voxel(0, 0, 0, 77.0)
            .with_voxel(1, 0, 0, 2.0)
            .with_voxel(2, 0, 0, 78.0),
    );
    let settings = PipelineSettings::default();
    let all: Vec<Backend> = BackendSelection::all().iter().collect();

    let report = Coordinator::new(&toolkit, &settings)
        .run(&request(dir.path(), &all, 2))
        .await
        .unwrap();

    assert!(!report.has_failures());
    assert_eq!(report.outcomes.len(), 7);
    for backend in Backend::ALL {
        assert!(root(dir.path()).join(format!("WMH_{backend}.nii")).exists(), "{backend}");
        assert!(root(dir.path()).join(format!("WMH_{backend}.txt")).is_file(), "{backend}");
        assert!(root(dir.path()).join("proc/seg").join(backend.name()).join("WMHvolume.txt").is_file());
    }

    // only the WMH label survives
    let synthseg = published(dir.path(), Backend::WmhSynthSeg);
    assert_eq!(synthseg.nonzero(), 1);
    assert_eq!(synthseg.value(0, 0, 0), 1.0);

    // UCD got a brain mask next to its output
    assert!(root(dir.path()).join("proc/seg/UCD/brainmask/FLAIR_brain_mask.nii.gz").is_file());
}

#[tokio::test]
async fn test_rerun_skips_preprocessing_and_keeps_volumes() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new();
    let settings = PipelineSettings::default();
    let req = request(dir.path(), &[Backend::Sysu], 1);
    let coordinator = Coordinator::new(&toolkit, &settings);

    coordinator.run(&req).await.unwrap();
    let pre = root(dir.path()).join("proc/pre");
    let before: Vec<Vec<u8>> = ["FLAIR.nii.gz", "T1.nii.gz", "3DT1.nii.gz"]
        .iter()
        .map(|n| fs::read(pre.join(n)).unwrap())
        .collect();
    toolkit.clear();

    let report = coordinator.run(&req).await.unwrap();

    assert_eq!(report.preprocess, PreprocessOutcome::Skipped);
    assert!(toolkit.invocations().iter().all(|i| i.stage != Stage::Preprocess));
    let after: Vec<Vec<u8>> = ["FLAIR.nii.gz", "T1.nii.gz", "3DT1.nii.gz"]
        .iter()
        .map(|n| fs::read(pre.join(n)).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_rerunning_one_backend_leaves_others_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new()
        .with_result(Backend::Pgs, SimVolume::new("RPI", FLAIR_SPACING).with_lesion(10));
    let settings = PipelineSettings::default();
    let coordinator = Coordinator::new(&toolkit, &settings);

    coordinator
        .run(&request(dir.path(), &[Backend::Pgs, Backend::Sysu], 1))
        .await
        .unwrap();
    let pgs_files = [
        root(dir.path()).join("WMH_PGS.txt"),
        root(dir.path()).join("WMH_PGS.nii"),
        root(dir.path()).join("proc/seg/PGS/WMHvolume.txt"),
    ];
    let before: Vec<Vec<u8>> = pgs_files.iter().map(|p| fs::read(p).unwrap()).collect();

    coordinator
        .run(&request(dir.path(), &[Backend::Sysu], 1))
        .await
        .unwrap();

    let after: Vec<Vec<u8>> = pgs_files.iter().map(|p| fs::read(p).unwrap()).collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_failing_backend_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new().failing(Backend::Ucd);
    let settings = PipelineSettings::default();

    let report = Coordinator::new(&toolkit, &settings)
        .run(&request(dir.path(), &[Backend::Sysu, Backend::Ucd, Backend::LstAi], 1))
        .await
        .unwrap();

    assert_eq!(report.failed().collect::<Vec<_>>(), [Backend::Ucd]);
    assert_eq!(
        report.succeeded().collect::<Vec<_>>(),
        [Backend::Sysu, Backend::LstAi]
    );
    assert!(!root(dir.path()).join("WMH_UCD.txt").exists());
    assert!(root(dir.path()).join("WMH_LSTAI.txt").is_file());

    let error = report.outcome(Backend::Ucd).and_then(|o| o.error()).unwrap();
    assert_eq!(error.backend(), Some(Backend::Ucd));
}

#[tokio::test]
async fn test_fail_fast_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new().failing(Backend::Pgs);
    let settings = PipelineSettings::default();
    let mut req = request(dir.path(), &[Backend::Pgs, Backend::Sysu], 1);
    req.fail_fast = true;

    let err = Coordinator::new(&toolkit, &settings).run(&req).await.unwrap_err();

    assert!(matches!(
        err,
        CoordinatorError::BackendFailed { backend: Backend::Pgs, .. }
    ));
    assert!(err.partial_report().is_some_and(|r| r.outcomes.is_empty()));
    assert!(toolkit.invocations().iter().all(|i| i.backend != Some(Backend::Sysu)));
    assert!(!root(dir.path()).join("WMH_SYSU.txt").exists());
}

#[tokio::test]
async fn test_empty_selection_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new();
    let settings = PipelineSettings::default();

    let err = Coordinator::new(&toolkit, &settings)
        .run(&request(dir.path(), &[], 1))
        .await
        .unwrap_err();

    assert!(err.is_usage());
    assert!(toolkit.invocations().is_empty());
    assert!(!root(dir.path()).exists());
}

#[tokio::test]
async fn test_copy_publish_mode_from_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let settings = ConfigLoader::load_from_str(
        "[publish]\nmode = \"copy\"\n\n[timeouts]\ndefault_secs = 60\n",
        ConfigFormat::Toml,
    )
    .unwrap();
    let toolkit = SimulatedToolkit::new();

    Coordinator::new(&toolkit, &settings)
        .run(&request(dir.path(), &[Backend::LstAi], 1))
        .await
        .unwrap();

    let published = root(dir.path()).join("WMH_LSTAI.nii");
    let meta = fs::symlink_metadata(&published).unwrap();
    assert!(meta.file_type().is_file());
    for invocation in toolkit.invocations() {
        assert_eq!(invocation.timeout.map(|t| t.as_secs()), Some(60));
    }
}

#[tokio::test]
async fn test_unparseable_volume_is_a_tool_failure() {
    let dir = tempfile::tempdir().unwrap();
    let toolkit = SimulatedToolkit::new();
    let settings = PipelineSettings::default();
    let req = request(dir.path(), &[Backend::Sysu], 1);
    fs::write(&req.t1, "not a volume").unwrap();

    let err = Coordinator::new(&toolkit, &settings).run(&req).await.unwrap_err();

    match err {
        CoordinatorError::PreprocessingFailed(ContractError::ExternalToolFailure { program, .. }) => {
            assert_eq!(program, "3dinfo");
        }
        other => panic!("unexpected error: {other}"),
    }
}
