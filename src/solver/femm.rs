//! Adapter driving an external FEMM-style magnetics tool.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use ndarray::Array2;
use num_complex::Complex64;

use crate::assembly::{ProblemModel, RegionShape};
use crate::solver::{GridFieldMap, SolveError};
use crate::{FieldMap, FieldSolver};

/// Rectangular window on which the external tool exports the solved field.
///
/// The window must cover the intended observation points; queries outside
/// it clamp to its edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleWindow {
    pub x_min_mm: f64,
    pub x_max_mm: f64,
    pub y_min_mm: f64,
    pub y_max_mm: f64,
    pub nx: usize,
    pub ny: usize,
}

impl SampleWindow {
    /// The export loop and grid map both assume at least 2x2 nodes over a
    /// window of positive extent.
    fn validate(&self) -> Result<(), SolveError> {
        if self.nx < 2 || self.ny < 2 {
            return Err(SolveError::InvalidWindow(format!(
                "needs at least 2x2 sample nodes, got {}x{}",
                self.ny, self.nx
            )));
        }
        if !(self.x_max_mm > self.x_min_mm) || !(self.y_max_mm > self.y_min_mm) {
            return Err(SolveError::InvalidWindow(format!(
                "extents are not increasing: x {}..{} mm, y {}..{} mm",
                self.x_min_mm, self.x_max_mm, self.y_min_mm, self.y_max_mm
            )));
        }
        Ok(())
    }

    fn axis(min: f64, max: f64, n: usize) -> Vec<f64> {
        let steps = (n - 1) as f64;
        (0..n).map(|i| min + (i as f64 / steps) * (max - min)).collect()
    }

    fn xs_mm(&self) -> Vec<f64> {
        Self::axis(self.x_min_mm, self.x_max_mm, self.nx)
    }

    fn ys_mm(&self) -> Vec<f64> {
        Self::axis(self.y_min_mm, self.y_max_mm, self.ny)
    }
}

/// Describes the composition of a `FemmSolver`.
pub struct FemmSolverDescriptor {
    /// The external tool binary.
    pub executable: PathBuf,
    /// Isolated working directory; the model file and field export inside
    /// it are recreated on every call and never shared between instances.
    pub work_dir: PathBuf,
    pub window: SampleWindow,
    pub timeout: Duration,
}

/// Submits assembled models to the external tool and retrieves the solved
/// field as a [`GridFieldMap`].
///
/// Each invocation is an isolated unit of work: the script and model file
/// in `work_dir` are rewritten per call, the call blocks until the tool
/// exits or the timeout elapses, and a timed-out or failed solve surfaces
/// as [`SolveError`] without retry.
pub struct FemmSolver {
    executable: PathBuf,
    work_dir: PathBuf,
    window: SampleWindow,
    timeout: Duration,
}

fn fmt(value: f64) -> String {
    format!("{:.9e}", value)
}

impl FemmSolver {
    /// Fails on a degenerate sample window; everything else is checked at
    /// solve time.
    pub fn new(desc: FemmSolverDescriptor) -> Result<Self, SolveError> {
        desc.window.validate()?;
        Ok(Self {
            executable: desc.executable,
            work_dir: desc.work_dir,
            window: desc.window,
            timeout: desc.timeout,
        })
    }

    /// Renders the model into the tool's Lua scripting dialect.
    ///
    /// The script mirrors the manual modeling sequence: problem definition,
    /// material table, one circle per layer boundary, block labels with
    /// mesh-size hints, circuit properties carrying the peak-valued phase
    /// phasors, an asymptotic open far boundary, then solve and a field
    /// export over the sample window.
    pub fn render_script(&self, model: &ProblemModel) -> String {
        let far = model.environment.far_boundary_radius_mm;
        let interface = model.environment.interface_y_mm();
        let mesh_base = 0.3 * model.stack_outer_radius_mm;
        let field_path = self.work_dir.join("field.csv");
        let model_path = self.work_dir.join("cable_model.fem");

        let mut s = String::new();
        s.push_str("-- generated model script; rewritten on every solve\n");
        s.push_str("newdocument(0)\n");
        s.push_str(&format!(
            "mi_probdef({}, \"millimeters\", \"planar\", 1e-8, {}, 10)\n",
            fmt(model.frequency_hz),
            fmt(2.0 * far),
        ));

        for (name, props) in &model.materials {
            // conductivity in MS/m, as the tool expects
            s.push_str(&format!(
                "mi_addmaterial(\"{}\", {}, {}, 0, 0, {}, 0, 0, 1, 0, 0, 0)\n",
                name,
                fmt(props.relative_permeability),
                fmt(props.relative_permeability),
                fmt(props.conductivity_s_per_m * 1e-6),
            ));
        }

        // Peak-valued circuits, one per phase conductor.
        for (index, phasor) in model.source.phasors.iter().enumerate() {
            let peak = phasor.phasor_a() * std::f64::consts::SQRT_2;
            s.push_str(&format!(
                "mi_addcircprop(\"icoil{}\", {}+I*{}, 1)\n",
                index + 1,
                fmt(peak.re),
                fmt(peak.im),
            ));
        }

        for region in &model.regions {
            match &region.shape {
                RegionShape::Annulus {
                    center_mm,
                    inner_mm,
                    outer_mm,
                } => {
                    let (cx, cy) = (center_mm[0], center_mm[1]);
                    // Outer boundary circle as two half arcs; the inner
                    // boundary is drawn by the neighbouring region.
                    s.push_str(&format!(
                        "mi_drawarc({}, {}, {}, {}, 180, 3)\n",
                        fmt(cx - outer_mm),
                        fmt(cy),
                        fmt(cx + outer_mm),
                        fmt(cy),
                    ));
                    s.push_str(&format!(
                        "mi_drawarc({}, {}, {}, {}, 180, 3)\n",
                        fmt(cx + outer_mm),
                        fmt(cy),
                        fmt(cx - outer_mm),
                        fmt(cy),
                    ));

                    let label_x = cx + (inner_mm + outer_mm) / 2.0;
                    let (circuit, mesh) = match region.phase {
                        Some(phase) => (format!("icoil{}", phase + 1), 0.5 * mesh_base),
                        None => ("<None>".to_string(), mesh_base),
                    };
                    s.push_str(&format!("mi_addblocklabel({}, {})\n", fmt(label_x), fmt(cy)));
                    s.push_str(&format!("mi_selectlabel({}, {})\n", fmt(label_x), fmt(cy)));
                    s.push_str(&format!(
                        "mi_setblockprop(\"{}\", 0, {}, \"{}\", 0, 0, 0)\n",
                        region.material,
                        fmt(mesh),
                        circuit,
                    ));
                    s.push_str("mi_clearselected()\n");
                }
                RegionShape::HalfPlaneBelow { y_mm } => {
                    // Interface chord across the far-boundary circle. When
                    // the interface cuts through the formation itself
                    // (surface-laid or shallow burial) the chord is skipped
                    // and the seawater label fills the whole environment,
                    // matching the manual modeling practice.
                    if *y_mm > formation_top_mm(model) {
                        let half_chord = (far * far - y_mm * y_mm).sqrt();
                        s.push_str(&format!(
                            "mi_drawline({}, {}, {}, {})\n",
                            fmt(-half_chord),
                            fmt(*y_mm),
                            fmt(half_chord),
                            fmt(*y_mm),
                        ));
                        let label_y = (y_mm - far) / 2.0;
                        s.push_str(&label_block(0.0, label_y, &region.material, 10.0 * mesh_base));
                    }
                }
                RegionShape::HalfPlaneAbove { y_mm } => {
                    let label_y = if *y_mm > formation_top_mm(model) {
                        (y_mm + far) / 2.0
                    } else {
                        // whole environment
                        far / 2.0
                    };
                    s.push_str(&label_block(0.0, label_y, &region.material, 10.0 * mesh_base));
                }
            }
        }

        s.push_str(&format!("mi_makeABC(7, {}, 0, 0, 0)\n", fmt(far)));
        s.push_str(&format!(
            "mi_saveas(\"{}\")\n",
            lua_path(&model_path.to_string_lossy()),
        ));
        s.push_str("mi_analyze(1)\n");
        s.push_str("mi_loadsolution()\n");

        s.push_str(&format!(
            "handle = openfile(\"{}\", \"w\")\n",
            lua_path(&field_path.to_string_lossy()),
        ));
        let xs = self.window.xs_mm();
        let ys = self.window.ys_mm();
        s.push_str(&format!(
            "for iy = 0, {} do\n\
             \tfor ix = 0, {} do\n\
             \t\tx = {} + ix * {}\n\
             \t\ty = {} + iy * {}\n\
             \t\tbx, by = mo_getb(x, y)\n\
             \t\twrite(handle, x, \",\", y, \",\", Re(bx), \",\", Im(bx), \",\", Re(by), \",\", Im(by), \"\\n\")\n\
             \tend\n\
             end\n",
            self.window.ny - 1,
            self.window.nx - 1,
            fmt(xs[0]),
            fmt((xs[xs.len() - 1] - xs[0]) / (self.window.nx - 1) as f64),
            fmt(ys[0]),
            fmt((ys[ys.len() - 1] - ys[0]) / (self.window.ny - 1) as f64),
        ));
        s.push_str("closefile(handle)\nmo_close()\nmi_close()\nquit()\n");
        s
    }

    /// Parses the tool's field export into a grid map.
    fn parse_field(&self, content: &str) -> Result<GridFieldMap, SolveError> {
        let xs = self.window.xs_mm();
        let ys = self.window.ys_mm();
        let mut bx = Array2::from_elem((ys.len(), xs.len()), Complex64::new(0.0, 0.0));
        let mut by = bx.clone();

        let mut rows = 0usize;
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<f64> = line
                .split(',')
                .map(|f| f.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|e| {
                    SolveError::MalformedOutput(format!("line {}: {e}", line_no + 1))
                })?;
            if fields.len() != 6 {
                return Err(SolveError::MalformedOutput(format!(
                    "line {}: expected 6 columns, got {}",
                    line_no + 1,
                    fields.len()
                )));
            }
            let iy = rows / xs.len();
            let ix = rows % xs.len();
            if iy >= ys.len() {
                return Err(SolveError::MalformedOutput(format!(
                    "more rows than the {}x{} sample window",
                    ys.len(),
                    xs.len()
                )));
            }
            // Rows must land on their grid node; a reordered export would
            // otherwise silently misplace samples.
            let tol_x = 1e-6 * (xs[xs.len() - 1] - xs[0]).max(1.0);
            let tol_y = 1e-6 * (ys[ys.len() - 1] - ys[0]).max(1.0);
            if (fields[0] - xs[ix]).abs() > tol_x || (fields[1] - ys[iy]).abs() > tol_y {
                return Err(SolveError::MalformedOutput(format!(
                    "line {}: row at ({}, {}) does not match grid node ({}, {})",
                    line_no + 1,
                    fields[0],
                    fields[1],
                    xs[ix],
                    ys[iy]
                )));
            }
            bx[[iy, ix]] = Complex64::new(fields[2], fields[3]);
            by[[iy, ix]] = Complex64::new(fields[4], fields[5]);
            rows += 1;
        }
        if rows != xs.len() * ys.len() {
            return Err(SolveError::MalformedOutput(format!(
                "expected {} field rows, got {rows}",
                xs.len() * ys.len()
            )));
        }

        GridFieldMap::new(xs, ys, bx, by)
    }
}

fn formation_top_mm(model: &ProblemModel) -> f64 {
    model
        .phase_centers_mm
        .iter()
        .map(|c| c[1] + model.stack_outer_radius_mm)
        .fold(f64::MIN, f64::max)
}

fn label_block(x: f64, y: f64, material: &str, mesh: f64) -> String {
    format!(
        "mi_addblocklabel({x}, {y})\nmi_selectlabel({x}, {y})\n\
         mi_setblockprop(\"{material}\", 0, {mesh}, \"<None>\", 0, 0, 0)\n\
         mi_clearselected()\n",
        x = fmt(x),
        y = fmt(y),
        material = material,
        mesh = fmt(mesh),
    )
}

fn lua_path(path: &str) -> String {
    path.replace('\\', "/")
}

impl FieldSolver for FemmSolver {
    fn solve(&mut self, model: &ProblemModel) -> Result<Box<dyn FieldMap>, SolveError> {
        fs::create_dir_all(&self.work_dir)?;
        let script_path = self.work_dir.join("cable_model.lua");
        let field_path = self.work_dir.join("field.csv");
        // stale exports from a previous invocation are never reused
        let _ = fs::remove_file(&field_path);
        fs::write(&script_path, self.render_script(model))?;

        let mut child = Command::new(&self.executable)
            .arg(format!("-lua-script={}", script_path.display()))
            .arg("-windowhide")
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drained on a separate thread; a chatty tool would otherwise fill
        // the pipe buffer and block before ever exiting.
        let stderr_drain = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut diagnostic = String::new();
                let _ = pipe.read_to_string(&mut diagnostic);
                diagnostic
            })
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SolveError::Timeout {
                    timeout_s: self.timeout.as_secs_f64(),
                });
            }
            std::thread::sleep(Duration::from_millis(50));
        };

        if !status.success() {
            let diagnostic = stderr_drain
                .and_then(|handle| handle.join().ok())
                .unwrap_or_default();
            return Err(SolveError::ToolFailure {
                status: status.code().unwrap_or(-1),
                diagnostic: diagnostic.trim().to_string(),
            });
        }

        let content = fs::read_to_string(&field_path).map_err(|e| {
            SolveError::MalformedOutput(format!(
                "field export {} unreadable: {e}",
                field_path.display()
            ))
        })?;
        Ok(Box::new(self.parse_field(&content)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{AssemblyDescriptor, ProblemModel};
    use crate::catalog::MaterialCatalog;
    use crate::environment::EnvironmentSpec;
    use crate::geometry::{
        CableCrossSection, FormationLayout, LayerRole, LayerSpec, PhaseFormation,
    };
    use crate::source::{ElectricalOperatingPoint, PhaseAssignment, ThreePhaseSource};

    fn model() -> ProblemModel {
        let xsec = CableCrossSection::build(&[
            LayerSpec::conductor_from_area(400.0, "copper").unwrap(),
            LayerSpec::new("insulation", 5.0, "xlpe", LayerRole::Insulation),
            LayerSpec::new("armour", 4.0, "steel_armour", LayerRole::Armour),
        ])
        .unwrap();
        let layout = FormationLayout::place(&xsec, PhaseFormation::Trefoil).unwrap();
        let env = EnvironmentSpec::subsea(1000.0, 5000.0).unwrap();
        let op = ElectricalOperatingPoint {
            rms_phase_current_a: 500.0,
            frequency_hz: 50.0,
        };
        let source = ThreePhaseSource::balanced(&op, PhaseAssignment::ABC);
        let catalog = MaterialCatalog::subsea_defaults();
        ProblemModel::assemble(AssemblyDescriptor {
            cross_section: &xsec,
            layout: &layout,
            environment: &env,
            source: &source,
            operating_frequency_hz: 50.0,
            catalog: &catalog,
        })
        .unwrap()
    }

    fn solver(window: SampleWindow) -> FemmSolver {
        FemmSolver::new(FemmSolverDescriptor {
            executable: PathBuf::from("femm"),
            work_dir: PathBuf::from("/tmp/cable-emf-test"),
            window,
            timeout: Duration::from_secs(60),
        })
        .unwrap()
    }

    fn window() -> SampleWindow {
        SampleWindow {
            x_min_mm: -4000.0,
            x_max_mm: 4000.0,
            y_min_mm: -2000.0,
            y_max_mm: 3000.0,
            nx: 3,
            ny: 2,
        }
    }

    #[test]
    fn script_rendering_is_deterministic() {
        let model = model();
        let solver = solver(window());
        assert_eq!(solver.render_script(&model), solver.render_script(&model));
    }

    #[test]
    fn script_carries_problem_and_sources() {
        let model = model();
        let script = solver(window()).render_script(&model);

        assert!(script.contains(&format!(
            "mi_probdef({}, \"millimeters\", \"planar\"",
            super::fmt(50.0)
        )));
        // peak-valued phase a circuit
        let peak = super::fmt(500.0 * std::f64::consts::SQRT_2);
        assert!(script.contains(&format!("mi_addcircprop(\"icoil1\", {peak}+I*")));
        assert!(script.contains("mi_addcircprop(\"icoil3\""));
        assert!(script.contains("mi_makeABC(7,"));
        assert!(script.contains("mi_analyze(1)"));

        // one material entry per snapshot entry
        let material_lines = script.matches("mi_addmaterial(").count();
        assert_eq!(material_lines, model.materials.len());

        // two arcs per annulus region
        let annuli = model
            .regions
            .iter()
            .filter(|r| matches!(r.shape, RegionShape::Annulus { .. }))
            .count();
        assert_eq!(script.matches("mi_drawarc(").count(), 2 * annuli);

        // buried deeper than the formation: the interface chord is drawn
        assert!(script.contains("mi_drawline("));
    }

    #[test]
    fn surface_laid_script_skips_the_interface_chord() {
        let xsec = CableCrossSection::build(&[
            LayerSpec::conductor_from_area(400.0, "copper").unwrap(),
        ])
        .unwrap();
        let layout = FormationLayout::place(&xsec, PhaseFormation::Trefoil).unwrap();
        let env = EnvironmentSpec::subsea(0.0, 5000.0).unwrap();
        let op = ElectricalOperatingPoint {
            rms_phase_current_a: 500.0,
            frequency_hz: 50.0,
        };
        let source = ThreePhaseSource::balanced(&op, PhaseAssignment::ABC);
        let catalog = MaterialCatalog::subsea_defaults();
        let model = ProblemModel::assemble(AssemblyDescriptor {
            cross_section: &xsec,
            layout: &layout,
            environment: &env,
            source: &source,
            operating_frequency_hz: 50.0,
            catalog: &catalog,
        })
        .unwrap();

        let script = solver(window()).render_script(&model);
        assert!(!script.contains("mi_drawline("));
    }

    /// 3x2 window export in row-major order, bx = ix, by = -iy (all real).
    fn export_rows() -> String {
        let xs = [-4000.0, 0.0, 4000.0];
        let ys = [-2000.0, 3000.0];
        let mut content = String::new();
        for (iy, y) in ys.iter().enumerate() {
            for (ix, x) in xs.iter().enumerate() {
                content.push_str(&format!(
                    "{x},{y},{bx},0.0,{by},0.5\n",
                    bx = ix as f64,
                    by = -(iy as f64),
                ));
            }
        }
        content
    }

    #[test]
    fn field_export_parses_into_a_grid_map() {
        let solver = solver(window());
        let map = solver.parse_field(&export_rows()).unwrap();

        let [bx, by] = map.flux_density_t(0.0, -2000.0); // grid node (1, 0)
        assert!((bx.re - 1.0).abs() < 1e-12);
        assert!((by.re - 0.0).abs() < 1e-12);
        assert!((by.im - 0.5).abs() < 1e-12);
    }

    #[test]
    fn truncated_export_is_malformed() {
        let solver = solver(window());
        let err = solver.parse_field("-4000,-2000,1,0,0,0\n").unwrap_err();
        assert!(matches!(err, SolveError::MalformedOutput(_)));
    }

    #[test]
    fn reordered_export_rows_are_malformed() {
        let solver = solver(window());
        let export = export_rows();
        let rows: Vec<&str> = export.lines().collect();

        let mut swapped = rows.clone();
        swapped.swap(0, 1);
        let err = solver.parse_field(&swapped.join("\n")).unwrap_err();
        assert!(matches!(err, SolveError::MalformedOutput(_)));

        // a row drifting off its grid node is equally rejected
        let mut drifted = rows.join("\n");
        drifted = drifted.replacen("-4000,-2000,", "-3900,-2000,", 1);
        let err = solver.parse_field(&drifted).unwrap_err();
        assert!(matches!(err, SolveError::MalformedOutput(_)));
    }

    #[test]
    fn degenerate_sample_window_is_rejected() {
        let build = |window: SampleWindow| {
            FemmSolver::new(FemmSolverDescriptor {
                executable: PathBuf::from("femm"),
                work_dir: PathBuf::from("/tmp/cable-emf-test"),
                window,
                timeout: Duration::from_secs(60),
            })
        };

        for (nx, ny) in [(0, 2), (1, 2), (3, 0), (3, 1)] {
            let mut bad = window();
            bad.nx = nx;
            bad.ny = ny;
            assert!(
                matches!(build(bad), Err(SolveError::InvalidWindow(_))),
                "window {ny}x{nx} was accepted"
            );
        }

        let mut flat = window();
        flat.y_max_mm = flat.y_min_mm;
        assert!(matches!(build(flat), Err(SolveError::InvalidWindow(_))));
    }

    #[test]
    fn missing_executable_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut solver = FemmSolver::new(FemmSolverDescriptor {
            executable: PathBuf::from("no-such-femm-binary"),
            work_dir: dir.path().to_path_buf(),
            window: window(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let err = solver.solve(&model()).unwrap_err();
        assert!(matches!(err, SolveError::Unavailable(_)));
    }

    /// A failing tool that floods stderr past the pipe buffer must still be
    /// reported as a failure with its diagnostic, not stall into a timeout.
    #[test]
    #[cfg(unix)]
    fn noisy_tool_failure_is_reported_not_stalled() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("noisy-tool.sh");
        fs::write(
            &tool,
            "#!/bin/sh\n\
             i=0\n\
             while [ $i -lt 20000 ]; do\n\
             \techo \"diagnostic spam $i\" 1>&2\n\
             \ti=$((i+1))\n\
             done\n\
             exit 3\n",
        )
        .unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let mut solver = FemmSolver::new(FemmSolverDescriptor {
            executable: tool,
            work_dir: dir.path().to_path_buf(),
            window: window(),
            timeout: Duration::from_secs(30),
        })
        .unwrap();
        match solver.solve(&model()).unwrap_err() {
            SolveError::ToolFailure { status, diagnostic } => {
                assert_eq!(status, 3);
                assert!(diagnostic.contains("diagnostic spam 19999"));
            }
            other => panic!("expected tool failure, got {other:?}"),
        }
    }
}
