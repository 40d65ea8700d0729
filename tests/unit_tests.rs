// tests/unit_tests.rs
use approx::assert_abs_diff_eq;
use ndarray::Array2;
use tiled_ndvi::io::BandBlock;
use tiled_ndvi::processing::indices::{IndexCalculator, EVI, NDI, SAVI};
use tiled_ndvi::RasterCalcError;

/// Helper function to create test bands with specific dimensions, repeating
/// each value list to fill `rows x cols`.
fn create_test_data(rows: usize, cols: usize, bands: &[&[f64]]) -> Vec<BandBlock> {
    bands
        .iter()
        .map(|values| {
            let data = Array2::from_shape_fn((rows, cols), |(r, c)| values[(r * cols + c) % values.len()]);
            BandBlock::new(data)
        })
        .collect()
}

/// Helper function to extract result values in row-major order
fn get_results(result: &BandBlock) -> Vec<f64> {
    result.data.iter().copied().collect()
}

/// Test NDVI calculation with known values
#[test]
fn test_ndvi_calculation() {
    let test_cases = [
        // RED, NIR, Expected NDVI
        (2500.0, 5000.0, 0.33333),
        (3000.0, 3000.0, 0.0),
        (500.0, 1000.0, 0.33333),
        (4000.0, 1000.0, -0.6),
    ];

    let red: Vec<f64> = test_cases.iter().map(|(red, _, _)| *red).collect();
    let nir: Vec<f64> = test_cases.iter().map(|(_, nir, _)| *nir).collect();
    let inputs = create_test_data(2, 2, &[&red, &nir]);

    let result = NDI::ndvi().calculate(&inputs).unwrap();
    let values = get_results(&result);

    for (i, (_, _, expected)) in test_cases.iter().enumerate() {
        assert_abs_diff_eq!(values[i], *expected, epsilon = 1e-4);
    }
    assert_eq!(result.valid_count(), 4);
}

/// NIR + RED == 0 yields an invalid NaN pixel, never an error
#[test]
fn test_ndvi_zero_denominator() {
    let inputs = create_test_data(1, 3, &[&[0.0, -5.0, 1.0], &[0.0, 5.0, 3.0]]);
    let result = NDI::ndvi().calculate(&inputs).unwrap();

    assert!(result.data[[0, 0]].is_nan());
    assert!(!result.is_valid(0, 0));
    assert!(result.data[[0, 1]].is_nan());
    assert!(!result.is_valid(0, 1));
    assert_abs_diff_eq!(result.data[[0, 2]], 0.5, epsilon = 1e-12);
    assert!(result.is_valid(0, 2));
}

/// A masked pixel in either band is masked in the output
#[test]
fn test_ndvi_propagates_mask() {
    let red = BandBlock::from_samples(Array2::from_shape_vec((2, 2), vec![100.0, 0.0, 100.0, 100.0]).unwrap(), Some(0.0));
    let nir = BandBlock::from_samples(
        Array2::from_shape_vec((2, 2), vec![300.0, 300.0, f64::NAN, 300.0]).unwrap(),
        None,
    );

    let result = NDI::ndvi().calculate(&[red, nir]).unwrap();
    assert!(result.is_valid(0, 0));
    assert!(!result.is_valid(0, 1)); // red nodata
    assert!(!result.is_valid(1, 0)); // nir NaN
    assert!(result.is_valid(1, 1));
    assert!(result.data[[0, 1]].is_nan());
    assert_abs_diff_eq!(result.data[[1, 1]], 0.5, epsilon = 1e-12);
}

#[test]
fn test_ndvi_is_exact_f64() {
    let inputs = create_test_data(1, 1, &[&[1234.0], &[4321.0]]);
    let result = NDI::ndvi().calculate(&inputs).unwrap();
    assert_eq!(result.data[[0, 0]], (4321.0 - 1234.0) / (4321.0 + 1234.0));
}

#[test]
fn test_ndwi_calculation() {
    let test_cases = [
        // GREEN, NIR, Expected NDWI
        (3000.0, 5000.0, -0.25),
        (2000.0, 2000.0, 0.0),
        (5000.0, 3000.0, 0.25),
    ];

    let green: Vec<f64> = test_cases.iter().map(|(green, _, _)| *green).collect();
    let nir: Vec<f64> = test_cases.iter().map(|(_, nir, _)| *nir).collect();
    let inputs = create_test_data(1, 3, &[&green, &nir]);

    let values = get_results(&NDI::ndwi().calculate(&inputs).unwrap());
    for (i, (_, _, expected)) in test_cases.iter().enumerate() {
        assert_abs_diff_eq!(values[i], *expected, epsilon = 1e-12);
    }
}

/// Test SAVI calculation with known values
#[test]
fn test_savi_calculation() {
    // SAVI = ((NIR - RED) / (NIR + RED + L)) * (1 + L), reflectance inputs
    let inputs = create_test_data(1, 2, &[&[0.5, 0.3], &[0.25, 0.3]]);
    let savi = SAVI::new(0, 1, 0.5, None);

    let values = get_results(&savi.calculate(&inputs).unwrap());
    assert_abs_diff_eq!(values[0], 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(values[1], 0.0, epsilon = 1e-12);
}

/// Test SAVI calculation with different soil factors
#[test]
fn test_savi_with_different_soil_factors() {
    let factors_and_expected = [
        (0.0, 1.0 / 3.0), // L=0: SAVI = NDVI
        (0.5, 0.3),
        (1.0, 0.25 / 1.75 * 2.0),
    ];

    for (soil_factor, expected) in factors_and_expected {
        let inputs = create_test_data(1, 1, &[&[0.5], &[0.25]]);
        let savi = SAVI::new(0, 1, soil_factor, None);
        let values = get_results(&savi.calculate(&inputs).unwrap());
        assert_abs_diff_eq!(values[0], expected, epsilon = 1e-12);
    }
}

#[test]
fn test_savi_input_scale() {
    let inputs = create_test_data(1, 1, &[&[5000.0], &[2500.0]]);
    let savi = SAVI::new(0, 1, 0.5, None).with_input_scale(10000.0);
    let values = get_results(&savi.calculate(&inputs).unwrap());
    assert_abs_diff_eq!(values[0], 0.3, epsilon = 1e-12);
}

/// Test EVI calculation with known values
#[test]
fn test_evi_calculation() {
    // EVI = 2.5 * (NIR - RED) / (NIR + 6*RED - 7.5*BLUE + 1)
    let inputs = create_test_data(1, 2, &[&[0.5, 0.3], &[0.1, 0.3], &[0.05, 0.1]]);
    let evi = EVI::new(0, 1, 2, None);

    let values = get_results(&evi.calculate(&inputs).unwrap());
    let expected = 2.5 * 0.4 / (0.5 + 0.6 - 0.375 + 1.0);
    assert_abs_diff_eq!(values[0], expected, epsilon = 1e-12);
    assert_abs_diff_eq!(values[1], 0.0, epsilon = 1e-12);
}

#[test]
fn test_evi_zero_denominator() {
    // 2.75 + 6*0 - 7.5*0.5 + 1 == 0
    let inputs = create_test_data(1, 1, &[&[2.75], &[0.0], &[0.5]]);
    let result = EVI::new(0, 1, 2, None).calculate(&inputs).unwrap();
    assert!(!result.is_valid(0, 0));
}

#[test]
fn test_shape_mismatch_is_invalid_input() {
    let mut inputs = create_test_data(2, 2, &[&[1.0]]);
    inputs.extend(create_test_data(2, 3, &[&[1.0]]));

    let err = NDI::ndvi().calculate(&inputs).unwrap_err();
    assert!(matches!(err, RasterCalcError::InvalidInput(_)));
}

#[test]
fn test_missing_input_is_invalid_input() {
    let inputs = create_test_data(2, 2, &[&[1.0]]);
    let err = NDI::ndvi().calculate(&inputs).unwrap_err();
    assert!(matches!(err, RasterCalcError::InvalidInput(_)));
}

/// Test that custom names are properly set
#[test]
fn test_custom_index_names() {
    let ndi = NDI::new(0, 1, Some("Custom NDI Name".to_string()));
    assert_eq!(ndi.name(), "Custom NDI Name");
    assert_eq!(NDI::new(0, 1, None).name(), "NDI");
    assert_eq!(NDI::ndvi().name(), "NDVI");

    let evi = EVI::new(0, 1, 2, Some("Custom EVI Name".to_string()));
    assert_eq!(evi.name(), "Custom EVI Name");

    let savi = SAVI::new(0, 1, 0.5, Some("Custom SAVI Name".to_string()));
    assert_eq!(savi.name(), "Custom SAVI Name");
}

/// Test that required_bands returns the correct number for each calculator
#[test]
fn test_required_bands() {
    assert_eq!(NDI::ndvi().required_bands(), 2);
    assert_eq!(EVI::new(0, 1, 2, None).required_bands(), 3);
    assert_eq!(SAVI::new(0, 1, 0.5, None).required_bands(), 2);
}
