//! Profile persistence for the external plotting/reporting collaborator.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sampler::EmfProfile;
use crate::Error;

/// How data should be saved to file.
#[derive(Debug)]
pub struct SaveSettings<P: AsRef<Path>> {
    /// The path to the save file.
    pub filename: P,
    /// What information to save.
    pub save_type: SaveType,
    /// Whether or not to overwrite any possible saved data.
    pub overwrite: bool,
}

/// Represents what data to save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveType {
    /// Save positions and scalar magnitudes only.
    Magnitude,
    /// Additionally save the complex flux density components.
    Full,
}

/// Per-configuration metadata stored next to a saved profile.
pub struct ProfileMeta {
    pub frequency_hz: f64,
    pub burial_depth_mm: f64,
    /// Phase-to-position assignment label, e.g. "abc".
    pub assignment: String,
}

/// Writes one profile into its own group of an HDF5 file.
pub fn write_profile_h5(
    file: &hdf5::File,
    group_name: &str,
    profile: &EmfProfile,
    save_type: SaveType,
    meta: &ProfileMeta,
) -> Result<(), Error> {
    let n = profile.samples.len();
    let group = file.create_group(group_name)?;

    let positions = ndarray::Array2::from_shape_fn((n, 2), |(i, j)| {
        profile.samples[i].position_mm[j]
    });
    let ds = group.new_dataset::<f64>().shape((n, 2)).create("position_mm")?;
    ds.write_slice(&positions.view(), ndarray::s![.., ..])?;

    let magnitudes = ndarray::Array1::from_vec(profile.magnitudes_t());
    let ds = group.new_dataset::<f64>().shape(n).create("magnitude_t")?;
    ds.write_slice(&magnitudes.view(), ndarray::s![..])?;

    if save_type == SaveType::Full {
        let components: [(&str, fn(&crate::sampler::FieldSample) -> f64); 4] = [
            ("bx_re_t", |s| s.b_phasor_t[0].re),
            ("bx_im_t", |s| s.b_phasor_t[0].im),
            ("by_re_t", |s| s.b_phasor_t[1].re),
            ("by_im_t", |s| s.b_phasor_t[1].im),
        ];
        for (name, component) in components {
            let values = ndarray::Array1::from_iter(profile.samples.iter().map(component));
            let ds = group.new_dataset::<f64>().shape(n).create(name)?;
            ds.write_slice(&values.view(), ndarray::s![..])?;
        }
    }

    group
        .new_attr::<f64>()
        .shape(hdf5::Extents::Scalar)
        .create("frequency_hz")?
        .write_scalar(&meta.frequency_hz)?;
    group
        .new_attr::<f64>()
        .shape(hdf5::Extents::Scalar)
        .create("burial_depth_mm")?
        .write_scalar(&meta.burial_depth_mm)?;
    let label: hdf5::types::VarLenUnicode = meta
        .assignment
        .parse()
        .map_err(|_| hdf5::Error::from("non-unicode assignment label"))?;
    group
        .new_attr::<hdf5::types::VarLenUnicode>()
        .shape(hdf5::Extents::Scalar)
        .create("assignment")?
        .write_scalar(&label)?;

    Ok(())
}

/// Writes a profile as ordered CSV rows of position and magnitude.
pub fn write_profile_csv<P: AsRef<Path>>(
    path: P,
    profile: &EmfProfile,
    save_type: SaveType,
) -> io::Result<()> {
    let mut file = File::create(path)?;

    match save_type {
        SaveType::Magnitude => {
            writeln!(file, "x_mm,y_mm,magnitude_t")?;
            for sample in &profile.samples {
                writeln!(
                    file,
                    "{:.9e},{:.9e},{:.9e}",
                    sample.position_mm[0], sample.position_mm[1], sample.magnitude_t,
                )?;
            }
        }
        SaveType::Full => {
            writeln!(file, "x_mm,y_mm,magnitude_t,bx_re_t,bx_im_t,by_re_t,by_im_t")?;
            for sample in &profile.samples {
                writeln!(
                    file,
                    "{:.9e},{:.9e},{:.9e},{:.9e},{:.9e},{:.9e},{:.9e}",
                    sample.position_mm[0],
                    sample.position_mm[1],
                    sample.magnitude_t,
                    sample.b_phasor_t[0].re,
                    sample.b_phasor_t[0].im,
                    sample.b_phasor_t[1].re,
                    sample.b_phasor_t[1].im,
                )?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{FieldSample, MagnitudeConvention};
    use num_complex::Complex64;

    fn profile() -> EmfProfile {
        EmfProfile {
            convention: MagnitudeConvention::Rms,
            samples: (0..5)
                .map(|i| FieldSample {
                    position_mm: [i as f64 * 100.0, 1000.0],
                    b_phasor_t: [
                        Complex64::new(1e-6, 2e-7),
                        Complex64::new(-3e-7, 0.0),
                    ],
                    magnitude_t: 1.1e-6,
                    boundary_adjacent: false,
                })
                .collect(),
        }
    }

    #[test]
    fn h5_groups_round_trip_datasets_and_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.h5");
        let meta = ProfileMeta {
            frequency_hz: 50.0,
            burial_depth_mm: 1000.0,
            assignment: "abc".to_string(),
        };

        let file = hdf5::File::create(&path).unwrap();
        write_profile_h5(&file, "full", &profile(), SaveType::Full, &meta).unwrap();
        write_profile_h5(&file, "magnitude", &profile(), SaveType::Magnitude, &meta).unwrap();
        file.close().unwrap();

        let file = hdf5::File::open(&path).unwrap();
        let group = file.group("full").unwrap();

        let positions = group.dataset("position_mm").unwrap().read_2d::<f64>().unwrap();
        assert_eq!(positions.dim(), (5, 2));
        assert_eq!(positions[[2, 0]], 200.0);
        assert_eq!(positions[[2, 1]], 1000.0);

        let magnitudes = group.dataset("magnitude_t").unwrap().read_1d::<f64>().unwrap();
        assert_eq!(magnitudes.len(), 5);
        assert_eq!(magnitudes[0], 1.1e-6);

        let bx_re = group.dataset("bx_re_t").unwrap().read_1d::<f64>().unwrap();
        assert_eq!(bx_re[0], 1e-6);
        let by_im = group.dataset("by_im_t").unwrap().read_1d::<f64>().unwrap();
        assert_eq!(by_im[0], 0.0);

        let frequency = group
            .attr("frequency_hz")
            .unwrap()
            .read_scalar::<f64>()
            .unwrap();
        assert_eq!(frequency, 50.0);
        let burial = group
            .attr("burial_depth_mm")
            .unwrap()
            .read_scalar::<f64>()
            .unwrap();
        assert_eq!(burial, 1000.0);
        let assignment = group
            .attr("assignment")
            .unwrap()
            .read_scalar::<hdf5::types::VarLenUnicode>()
            .unwrap();
        assert_eq!(assignment.as_str(), "abc");

        // magnitude-only groups carry no component datasets
        let group = file.group("magnitude").unwrap();
        assert!(group.dataset("magnitude_t").is_ok());
        assert!(group.dataset("bx_re_t").is_err());
    }

    #[test]
    fn csv_magnitude_rows_match_sample_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.csv");
        write_profile_csv(&path, &profile(), SaveType::Magnitude).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "x_mm,y_mm,magnitude_t");
        assert_eq!(lines.len(), 6);
        assert!(lines[1].starts_with("0.000000000e0,1.000000000e3,"));
    }

    #[test]
    fn csv_full_rows_carry_complex_components() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile_full.csv");
        write_profile_csv(&path, &profile(), SaveType::Full).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "x_mm,y_mm,magnitude_t,bx_re_t,bx_im_t,by_re_t,by_im_t"
        );
        assert_eq!(lines[1].split(',').count(), 7);
    }
}
