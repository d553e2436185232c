use cable_emf::export::{write_profile_h5, ProfileMeta};
use cable_emf::prelude::*;

use std::path::PathBuf;
use std::time::Duration;

fn main() {
    let catalog = MaterialCatalog::subsea_defaults();

    let layers = vec![
        LayerSpec::conductor_from_area(630.0, "copper").unwrap(),
        LayerSpec::new("conductor_screen", 1.5, "semiconductive_screen", LayerRole::ConductorScreen),
        LayerSpec::new("insulation", 17.0, "xlpe", LayerRole::Insulation),
        LayerSpec::new(
            "insulation_screen_nm",
            1.2,
            "semiconductive_screen",
            LayerRole::InsulationScreenNonMetallic,
        ),
        LayerSpec::new("insulation_screen_me", 2.5, "lead_sheath", LayerRole::InsulationScreenMetallic),
        LayerSpec::new("bedding", 2.0, "pvc", LayerRole::Bedding),
        LayerSpec::new("armour", 5.6, "steel_armour", LayerRole::Armour),
        LayerSpec::new("over_sheath", 4.0, "pvc", LayerRole::OverSheath),
    ];

    // an external FEMM install takes over when FEMM_BIN points at it
    let mut femm;
    let mut filament = FilamentSolver;
    let solver: &mut dyn FieldSolver = match std::env::var_os("FEMM_BIN") {
        Some(executable) => {
            femm = FemmSolver::new(FemmSolverDescriptor {
                executable: PathBuf::from(executable),
                work_dir: PathBuf::from("data/femm_work"),
                window: SampleWindow {
                    x_min_mm: -10_000.0,
                    x_max_mm: 10_000.0,
                    y_min_mm: -500.0,
                    y_max_mm: 3_500.0,
                    nx: 201,
                    ny: 81,
                },
                timeout: Duration::from_secs(600),
            })
            .unwrap();
            &mut femm
        }
        None => &mut filament,
    };

    std::fs::create_dir_all("data").unwrap();
    let file = hdf5::File::create("data/burial_sweep.h5").unwrap();
    println!("-- Seabed-Surface Maxima --");
    // 0.5 m burial steps down to 3 m, each scanned along its own
    // seabed/seawater interface
    for i in 1..=6 {
        let burial_depth_mm = i as f64 * 500.0;
        let config = CableConfig {
            id: format!("burial_{burial_depth_mm:04.0}"),
            layers: layers.clone(),
            formation: PhaseFormation::Trefoil,
            environment: EnvironmentSpec::subsea(burial_depth_mm, 30_000.0).unwrap(),
            operating_point: ElectricalOperatingPoint {
                rms_phase_current_a: 715.0, // [A]
                frequency_hz: 50.0,         // [Hz]
            },
            assignment: PhaseAssignment::ABC,
        };

        let points =
            ObservationLine::horizontal(burial_depth_mm, -10_000.0, 10_000.0, 401).points();
        let profile = run_pipeline(
            solver,
            &config,
            &catalog,
            &points,
            MagnitudeConvention::Rms,
        )
        .unwrap();

        println!(
            "{}:  {:<9.3e} T  ({:.3} µT)",
            config.id,
            profile.max_magnitude_t(),
            profile.max_magnitude_t() * 1e6,
        );
        write_profile_h5(
            &file,
            &config.id,
            &profile,
            SaveType::Magnitude,
            &ProfileMeta {
                frequency_hz: config.operating_point.frequency_hz,
                burial_depth_mm,
                assignment: config.assignment.label(),
            },
        )
        .unwrap();
    }
    file.close().unwrap();

    println!("\nprofiles written to data/burial_sweep.h5");
}
