//! Synthetic spectra shared by the unit tests

use std::f64::consts::PI;

use crate::data::spectrum::{Data1D, Data2D, Info, Matrix, Nucleus, Spectrum, Spectrum1D, Spectrum2D};
use crate::reducer::action::Action;
use crate::reducer::reduce;
use crate::state::State;

pub const SW_HZ: f64 = 4000.0;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Complex FID of a single line at +0.5 ppm from the carrier, sampled at `SW_HZ`
pub fn fid_1d(n: usize, observe_mhz: f64) -> (Data1D, Info) {
    let dwell = 1.0 / SW_HZ;
    let f = 0.5 * observe_mhz;
    let mut x = Vec::with_capacity(n);
    let mut re = Vec::with_capacity(n);
    let mut im = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64 * dwell;
        let decay = (-t / 0.05).exp();
        x.push(t);
        re.push((2.0 * PI * f * t).cos() * decay);
        im.push((2.0 * PI * f * t).sin() * decay);
    }
    let info = Info {
        name: "fid".into(),
        is_fid: true,
        is_ft: false,
        is_complex: true,
        origin_frequency: vec![observe_mhz],
        ..Info::default()
    };
    (Data1D { x, re, im: Some(im) }, info)
}

/// Frequency-domain spectrum over 0–10 ppm with Lorentzian lines `(ppm, height)`
pub fn ft_1d(lines: &[(f64, f64)]) -> (Data1D, Info) {
    let n = 1001;
    let width = 0.02;
    let x: Vec<f64> = (0..n).map(|i| i as f64 * 0.01).collect();
    let re = x
        .iter()
        .map(|&xi| {
            lines
                .iter()
                .map(|&(c, h)| h / (1.0 + ((xi - c) / width).powi(2)))
                .sum()
        })
        .collect();
    (Data1D { x, re, im: None }, Info::default())
}

pub fn fid_spectrum(id: &str, n: usize) -> Spectrum {
    let (data, info) = fid_1d(n, 400.0);
    let mut s = Spectrum1D::new(info, data);
    s.id = id.to_string();
    Spectrum::OneD(s)
}

pub fn ft_spectrum(id: &str, nucleus: Nucleus, lines: &[(f64, f64)]) -> Spectrum {
    let (data, mut info) = ft_1d(lines);
    info.name = id.to_string();
    info.nucleus = vec![nucleus];
    let mut s = Spectrum1D::new(info, data);
    s.id = id.to_string();
    Spectrum::OneD(s)
}

fn info_2d(id: &str, is_fid: bool) -> Info {
    Info {
        name: id.to_string(),
        dimension: 2,
        nucleus: vec![Nucleus::H1, Nucleus::C13],
        is_fid,
        is_ft: !is_fid,
        origin_frequency: vec![400.0, 100.0],
        frequency_offset: vec![5.0, 80.0],
        ..Info::default()
    }
}

/// 2D FID with one cross peak, `rows` increments of `cols` points
pub fn fid_2d_spectrum(id: &str, rows: usize, cols: usize) -> Spectrum {
    let dwell = 1.0 / SW_HZ;
    let z = (0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| {
                    let (t1, t2) = (r as f64 * dwell, c as f64 * dwell);
                    (2.0 * PI * 300.0 * t2).cos() * (2.0 * PI * 150.0 * t1).cos()
                })
                .collect()
        })
        .collect();
    let rr = Matrix {
        min_x: 0.0,
        max_x: (cols.max(2) - 1) as f64 * dwell,
        min_y: 0.0,
        max_y: (rows.max(2) - 1) as f64 * dwell,
        z,
    };
    let mut s = Spectrum2D::new(info_2d(id, true), Data2D { rr, ii: None });
    s.id = id.to_string();
    Spectrum::TwoD(s)
}

/// 1H–13C correlation map (0–10 ppm × 0–200 ppm) with Gaussian cross peaks
/// `(x, y, height)`
pub fn ft_2d_spectrum(id: &str, peaks: &[(f64, f64, f64)]) -> Spectrum {
    let (rows, cols) = (101, 101);
    let mut rr = Matrix {
        min_x: 0.0,
        max_x: 10.0,
        min_y: 0.0,
        max_y: 200.0,
        z: vec![vec![0.0; cols]; rows],
    };
    for r in 0..rows {
        for c in 0..cols {
            let (x, y) = (rr.x_at(c), rr.y_at(r));
            rr.z[r][c] = peaks
                .iter()
                .map(|&(px, py, h)| h * (-((x - px) / 0.1).powi(2) - ((y - py) / 2.0).powi(2)).exp())
                .sum();
        }
    }
    let mut s = Spectrum2D::new(info_2d(id, false), Data2D { rr, ii: None });
    s.id = id.to_string();
    Spectrum::TwoD(s)
}

/// State holding `spectra` after a load action
pub fn state_with(spectra: Vec<Spectrum>) -> State {
    init_logger();
    let state = reduce(&State::default(), Action::LoadSpectra { spectra });
    assert!(state.error_action.is_none(), "{:?}", state.error_action);
    state
}
