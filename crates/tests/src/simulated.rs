//! Simulated image toolkit
//!
//! Volumes are small JSON documents: an orientation code, voxel spacing, an
//! oblique flag and a sparse map of voxel coordinates to values. Each tool
//! the pipeline calls is modelled by what it does to that document, so
//! thresholds, flips and volumes can be checked on actual data.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use contracts::{verify_outputs, Backend, ContractError, ToolInvocation, ToolOutput, ToolRunner};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sparse voxel volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimVolume {
    pub orientation: String,
    pub spacing: [f64; 3],
    #[serde(default)]
    pub oblique: bool,
    /// `"x,y,z"` -> value; absent voxels are 0
    #[serde(default)]
    pub voxels: BTreeMap<String, f64>,
}

fn key(x: i32, y: i32, z: i32) -> String {
    format!("{x},{y},{z}")
}

fn parse_key(key: &str) -> Option<[i32; 3]> {
    let mut parts = key.split(',').map(|p| p.parse::<i32>().ok());
    let coord = [parts.next()??, parts.next()??, parts.next()??];
    parts.next().is_none().then_some(coord)
}

impl SimVolume {
    pub fn new(orientation: &str, spacing: [f64; 3]) -> Self {
        Self {
            orientation: orientation.to_string(),
            spacing,
            oblique: false,
            voxels: BTreeMap::new(),
        }
    }

    pub fn oblique(mut self) -> Self {
        self.oblique = true;
        self
    }

    pub fn with_voxel(mut self, x: i32, y: i32, z: i32, value: f64) -> Self {
        self.voxels.insert(key(x, y, z), value);
        self
    }

    /// `count` voxels of value 1 along a line
    pub fn with_lesion(mut self, count: usize) -> Self {
        for i in 0..count {
            let i = i as i32;
            self.voxels.insert(key(i % 64, (i / 64) % 64, i / 4096), 1.0);
        }
        self
    }

    pub fn value(&self, x: i32, y: i32, z: i32) -> f64 {
        self.voxels.get(&key(x, y, z)).copied().unwrap_or(0.0)
    }

    pub fn nonzero(&self) -> usize {
        self.voxels.values().filter(|v| **v != 0.0).count()
    }

    pub fn voxel_volume_ul(&self) -> f64 {
        self.spacing.iter().product()
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is not a simulated volume: {e}", path.display()),
            )
        })
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, json)
    }

    fn map_values(&mut self, f: impl Fn(f64) -> f64) {
        for value in self.voxels.values_mut() {
            *value = f(*value);
        }
        self.voxels.retain(|_, v| *v != 0.0);
    }

    /// `fslswapdim`-style axis remap, e.g. `["-x", "-y", "z"]`
    fn swap_dims(&mut self, swap: &[String]) -> io::Result<()> {
        let mut axes = [(0usize, 1i32); 3];
        for (slot, spec) in swap.iter().enumerate().take(3) {
            let (sign, name) = match spec.strip_prefix('-') {
                Some(name) => (-1, name),
                None => (1, spec.as_str()),
            };
            let axis = match name {
                "x" => 0,
                "y" => 1,
                "z" => 2,
                other => return Err(invalid(format!("unsupported swap axis '{other}'"))),
            };
            axes[slot] = (axis, sign);
        }

        let mut swapped = BTreeMap::new();
        for (k, value) in &self.voxels {
            let old = parse_key(k).ok_or_else(|| invalid(format!("bad voxel key '{k}'")))?;
            let new = axes.map(|(axis, sign)| sign * old[axis]);
            swapped.insert(key(new[0], new[1], new[2]), *value);
        }
        self.voxels = swapped;
        Ok(())
    }
}

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message)
}

/// Value following `flag` in an argument list
fn value_after<'a>(args: &'a [String], flag: &str) -> io::Result<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .ok_or_else(|| invalid(format!("missing {flag}")))
}

fn arg(args: &[String], index: usize) -> io::Result<&str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| invalid(format!("missing argument {index}")))
}

fn copy_volume(from: &str, to: &str) -> io::Result<()> {
    SimVolume::load(Path::new(from))?.save(Path::new(to))
}

fn base_name(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(program)
}

/// `ToolRunner` that executes every tool against simulated volumes
pub struct SimulatedToolkit {
    results: BTreeMap<Backend, SimVolume>,
    failing: Vec<Backend>,
    invocations: Mutex<Vec<ToolInvocation>>,
}

impl Default for SimulatedToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedToolkit {
    pub fn new() -> Self {
        Self {
            results: BTreeMap::new(),
            failing: Vec::new(),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Raw volume the backend writes to each of its outputs
    pub fn with_result(mut self, backend: Backend, volume: SimVolume) -> Self {
        self.results.insert(backend, volume);
        self
    }

    /// Every invocation of the backend exits with status 1
    pub fn failing(mut self, backend: Backend) -> Self {
        self.failing.push(backend);
        self
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.invocations.lock().unwrap().clear();
    }

    fn default_result() -> SimVolume {
        SimVolume::new("RPI", [1.0, 1.0, 1.0]).with_voxel(0, 0, 0, 1.0)
    }

    fn simulate(&self, invocation: &ToolInvocation) -> io::Result<String> {
        let args = invocation.args_lossy();
        let program = base_name(&invocation.program);
        debug!(program, ?args, "simulating tool");

        match program {
            "3dinfo" => {
                let volume = SimVolume::load(Path::new(arg(&args, 1)?))?;
                match arg(&args, 0)? {
                    "-is_oblique" => Ok(if volume.oblique { "1" } else { "0" }.to_string()),
                    "-orient" => Ok(volume.orientation),
                    "-ad3" => {
                        let [x, y, z] = volume.spacing;
                        Ok(format!("{x}\t{y}\t{z}"))
                    }
                    other => Err(invalid(format!("unsupported 3dinfo query {other}"))),
                }
            }
            "3dresample" => {
                let mut volume = SimVolume::load(Path::new(value_after(&args, "-input")?))?;
                volume.orientation = value_after(&args, "-orient")?.to_string();
                if let Some(i) = args.iter().position(|a| a == "-dxyz") {
                    for axis in 0..3 {
                        volume.spacing[axis] = arg(&args, i + 1 + axis)?
                            .parse()
                            .map_err(|e| invalid(format!("bad -dxyz: {e}")))?;
                    }
                }
                volume.save(Path::new(value_after(&args, "-prefix")?))?;
                Ok(String::new())
            }
            "3drefit" => {
                let path = Path::new(value_after(&args, "-deoblique")?);
                let mut volume = SimVolume::load(path)?;
                volume.oblique = false;
                volume.save(path)?;
                Ok(String::new())
            }
            "N4BiasFieldCorrection" => {
                copy_volume(value_after(&args, "-i")?, value_after(&args, "-o")?)?;
                Ok(String::new())
            }
            "mri_synthsr" => {
                copy_volume(value_after(&args, "--i")?, value_after(&args, "--o")?)?;
                Ok(String::new())
            }
            "nifti_tool" => Ok(String::new()),
            "flirt" => {
                let reference = SimVolume::load(Path::new(value_after(&args, "-ref")?))?;
                let mut volume = SimVolume::load(Path::new(value_after(&args, "-in")?))?;
                volume.orientation = reference.orientation;
                volume.spacing = reference.spacing;
                volume.save(Path::new(value_after(&args, "-out")?))?;
                if !args.iter().any(|a| a == "-applyxfm") {
                    fs::write(value_after(&args, "-omat")?, "1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n")?;
                }
                Ok(String::new())
            }
            "convert_xfm" => {
                let matrix = fs::read_to_string(value_after(&args, "-inverse")?)?;
                fs::write(value_after(&args, "-omat")?, matrix)?;
                Ok(String::new())
            }
            "fslchfiletype" => {
                copy_volume(arg(&args, 1)?, arg(&args, 2)?)?;
                Ok(String::new())
            }
            "fslmaths" => {
                let (input, rest) = args.split_first().ok_or_else(|| invalid("no input".into()))?;
                let (output, ops) = rest.split_last().ok_or_else(|| invalid("no output".into()))?;
                let mut volume = SimVolume::load(Path::new(input))?;
                let mut ops = ops.iter();
                while let Some(op) = ops.next() {
                    match op.as_str() {
                        "-bin" => volume.map_values(|v| if v != 0.0 { 1.0 } else { 0.0 }),
                        "-thr" | "-uthr" => {
                            let limit: f64 = ops
                                .next()
                                .ok_or_else(|| invalid(format!("{op} needs a value")))?
                                .parse()
                                .map_err(|e| invalid(format!("bad {op} value: {e}")))?;
                            if op == "-thr" {
                                volume.map_values(|v| if v < limit { 0.0 } else { v });
                            } else {
                                volume.map_values(|v| if v > limit { 0.0 } else { v });
                            }
                        }
                        other => return Err(invalid(format!("unsupported fslmaths op {other}"))),
                    }
                }
                volume.save(Path::new(output))?;
                Ok(String::new())
            }
            "fslswapdim" => {
                let mut volume = SimVolume::load(Path::new(arg(&args, 0)?))?;
                volume.swap_dims(args.get(1..4).unwrap_or_default())?;
                volume.save(Path::new(arg(&args, 4)?))?;
                Ok(String::new())
            }
            "fslcpgeom" => {
                let source = SimVolume::load(Path::new(arg(&args, 0)?))?;
                let target_path = Path::new(arg(&args, 1)?);
                let mut target = SimVolume::load(target_path)?;
                target.orientation = source.orientation;
                target.spacing = source.spacing;
                target.save(target_path)?;
                Ok(String::new())
            }
            "fslstats" => {
                let volume = SimVolume::load(Path::new(arg(&args, 0)?))?;
                let count = volume.nonzero();
                Ok(format!("{count} {:.6}", count as f64 * volume.voxel_volume_ul()))
            }
            "bet" => {
                let mut volume = SimVolume::load(Path::new(arg(&args, 0)?))?;
                let prefix = arg(&args, 1)?;
                volume.save(Path::new(&format!("{prefix}.nii.gz")))?;
                volume.map_values(|v| if v != 0.0 { 1.0 } else { 0.0 });
                volume.save(Path::new(&format!("{prefix}_mask.nii.gz")))?;
                Ok(String::new())
            }
            "docker" | "podman" | "apptainer" | "matlab" | "mri_WMHsynthseg" => {
                let result = invocation
                    .backend
                    .and_then(|b| self.results.get(&b).cloned())
                    .unwrap_or_else(Self::default_result);
                for output in &invocation.outputs {
                    result.save(output)?;
                }
                Ok(String::new())
            }
            other => Err(invalid(format!("no simulation for {other}"))),
        }
    }
}

impl ToolRunner for SimulatedToolkit {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ContractError> {
        self.invocations.lock().unwrap().push(invocation.clone());

        if invocation.backend.is_some_and(|b| self.failing.contains(&b)) {
            return Err(invocation.failure(Some(1), "simulated failure"));
        }

        let stdout = self
            .simulate(invocation)
            .map_err(|e| invocation.failure(Some(1), e.to_string()))?;
        verify_outputs(invocation)?;
        Ok(ToolOutput::ok(stdout))
    }
}

/// Write a pair of simulated inputs, returning their paths
pub fn write_inputs(dir: &Path, t1: &SimVolume, flair: &SimVolume) -> io::Result<(PathBuf, PathBuf)> {
    let t1_path = dir.join("t1.nii");
    let flair_path = dir.join("flair.nii");
    t1.save(&t1_path)?;
    flair.save(&flair_path)?;
    Ok((t1_path, flair_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_negates_x_and_y() {
        let mut volume = SimVolume::new("RPI", [1.0, 1.0, 1.0]).with_voxel(3, 5, 2, 1.0);
        volume
            .swap_dims(&["-x".to_string(), "-y".to_string(), "z".to_string()])
            .unwrap();
        assert_eq!(volume.value(-3, -5, 2), 1.0);
        assert_eq!(volume.value(3, 5, 2), 0.0);
    }

    #[test]
    fn test_lesion_helper_counts() {
        assert_eq!(SimVolume::new("RPI", [1.0, 1.0, 1.0]).with_lesion(1532).nonzero(), 1532);
    }
}
