use cable_emf::prelude::*;

fn main() {
    let catalog = MaterialCatalog::subsea_defaults();

    // 630 mm² copper conductor, trefoil, laid directly on the seabed
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

    let config = CableConfig {
        id: "surface_laid_630".to_string(),
        layers,
        formation: PhaseFormation::Trefoil,
        environment: EnvironmentSpec::subsea(0.0, 20_000.0).unwrap(),
        operating_point: ElectricalOperatingPoint {
            rms_phase_current_a: 715.0, // [A]
            frequency_hz: 50.0,         // [Hz]
        },
        assignment: PhaseAssignment::ABC,
    };

    let cross_section = CableCrossSection::build(&config.layers).unwrap();
    println!(
        "\n-- General Model Info --\n\
        conductor radius:  {:<9.3} mm\n\
        stack radius:      {:<9.3} mm\n\
        burial depth:      {:<9.3} mm\n\
        phase current:     {:<9.1} A rms\n",
        cross_section.conductor_radius_mm(),
        cross_section.outer_radius_mm(),
        config.environment.burial_depth_mm,
        config.operating_point.rms_phase_current_a,
    );

    // 1 m above the seabed, ±10 m laterally
    let points = ObservationLine::horizontal(1000.0, -10_000.0, 10_000.0, 401).points();

    println!("-- Solve --");
    let profile = run_pipeline(
        &mut FilamentSolver,
        &config,
        &catalog,
        &points,
        MagnitudeConvention::Rms,
    )
    .unwrap();

    println!(
        "max |B| on the line: {:.3e} T ({:.3} µT)",
        profile.max_magnitude_t(),
        profile.max_magnitude_t() * 1e6,
    );

    std::fs::create_dir_all("data").unwrap();
    cable_emf::export::write_profile_csv("data/surface_laid.csv", &profile, SaveType::Full)
        .unwrap();
    println!("profile written to data/surface_laid.csv");
}
