// Per-voice pitch Markov tables, major and minor, derived from the corpus.
//
// First-order chains over spelled pitches. Every state is a legal final
// (phrase endings are governed by the cadence formulas, not the chains);
// the ambitus pair clamps the line to the voice's singable range and the
// initial ambitus keeps openings near the voice's center.

use crate::Voice;
use cantus_engine::error::GenError;
use cantus_engine::producers::{NodeGuard, PitchChain, PitchMarkovProducer};
use std::collections::BTreeMap;

fn table(rows: &[(&str, &[(&str, f64)])]) -> BTreeMap<String, Vec<(String, f64)>> {
    rows.iter()
        .map(|(state, row)| {
            (state.to_string(), row.iter().map(|(s, w)| (s.to_string(), *w)).collect())
        })
        .collect()
}

fn chain(
    ambitus: (&str, &str),
    ambitus_initial: (&str, &str),
    initial: &[&str],
    rows: &[(&str, &[(&str, f64)])],
) -> PitchChain {
    let transitions = table(rows);
    let finals = transitions.keys().cloned().collect();
    PitchChain {
        initial: initial.iter().map(|s| s.to_string()).collect(),
        transitions,
        finals,
        ambitus: (ambitus.0.to_string(), ambitus.1.to_string()),
        ambitus_initial: (ambitus_initial.0.to_string(), ambitus_initial.1.to_string()),
    }
}

pub fn soprano_major() -> PitchChain {
    chain(
        ("C4", "A5"),
        ("E4", "E5"),
        &["C4", "E4", "G4", "C5", "E5"],
        &[
            ("C4", &[("A3", 0.025), ("B3", 0.025), ("C4", 0.269), ("C5", 0.017), ("D3", 0.025), ("D4", 0.294), ("E4", 0.168), ("F4", 0.067), ("G3", 0.050), ("G4", 0.059)]),
            ("D4", &[("B3", 0.018), ("B4", 0.009), ("C4", 0.316), ("D3", 0.026), ("D4", 0.237), ("E4", 0.307), ("F4", 0.026), ("G3", 0.026), ("G4", 0.035)]),
            ("E4", &[("C4", 0.199), ("D3", 0.007), ("D4", 0.267), ("E4", 0.130), ("F4", 0.260), ("G4", 0.137)]),
            ("F4", &[("A4", 0.051), ("D3", 0.013), ("D4", 0.090), ("E4", 0.449), ("F4", 0.038), ("G4", 0.359)]),
            ("B3", &[("A3", 0.143), ("C4", 0.714), ("E5", 0.143)]),
            ("G4", &[("A4", 0.224), ("B4", 0.032), ("C4", 0.014), ("C5", 0.123), ("D4", 0.014), ("D5", 0.009), ("E4", 0.146), ("F4", 0.110), ("G3", 0.009), ("G4", 0.315), ("G5", 0.005)]),
            ("A4", &[("A4", 0.305), ("B4", 0.282), ("C5", 0.051), ("D5", 0.034), ("E5", 0.006), ("F4", 0.006), ("G4", 0.316)]),
            ("A3", &[("A3", 0.167), ("B3", 0.167), ("D3", 0.167), ("E4", 0.167), ("F3", 0.167), ("G3", 0.167)]),
            ("C5", &[("A4", 0.075), ("A5", 0.006), ("B4", 0.314), ("C4", 0.006), ("C5", 0.094), ("D5", 0.283), ("E4", 0.006), ("E5", 0.101), ("F5", 0.044), ("G3", 0.006), ("G4", 0.050), ("G5", 0.013)]),
            ("B4", &[("A4", 0.299), ("B4", 0.339), ("C5", 0.236), ("D5", 0.011), ("E5", 0.006), ("G4", 0.109)]),
            ("G3", &[("C4", 0.560), ("D5", 0.040), ("E4", 0.080), ("G3", 0.320)]),
            ("D5", &[("A3", 0.007), ("A4", 0.029), ("B4", 0.057), ("C4", 0.007), ("C5", 0.264), ("D5", 0.186), ("E4", 0.007), ("E5", 0.343), ("F5", 0.021), ("G3", 0.021), ("G4", 0.014), ("G5", 0.043)]),
            ("E5", &[("A5", 0.058), ("C4", 0.007), ("C5", 0.173), ("D3", 0.007), ("D5", 0.403), ("E5", 0.158), ("F#5", 0.007), ("F5", 0.122), ("G5", 0.065)]),
            ("F5", &[("C5", 0.021), ("D3", 0.021), ("D5", 0.021), ("E5", 0.646), ("F5", 0.062), ("G5", 0.229)]),
            ("A5", &[("A-5", 0.050), ("A5", 0.200), ("G5", 0.750)]),
            ("G5", &[("A5", 0.090), ("C5", 0.015), ("E4", 0.015), ("E5", 0.299), ("F5", 0.254), ("G5", 0.328)]),
            ("A-5", &[("E5", 1.000)]),
            ("F#5", &[("A5", 1.000)]),
            ("D3", &[("G3", 1.000)]),
            ("F3", &[("G3", 1.000)]),
        ],
    )
}

pub fn alto_major() -> PitchChain {
    chain(
        ("G3", "D5"),
        ("A3", "C5"),
        &["G3", "C4", "E4", "G4"],
        &[
            ("G3", &[("A3", 0.267), ("B3", 0.027), ("C4", 0.120), ("D4", 0.013), ("E3", 0.027), ("F3", 0.027), ("G3", 0.520)]),
            ("B3", &[("A3", 0.125), ("B3", 0.163), ("C4", 0.500), ("D4", 0.037), ("G3", 0.175)]),
            ("C4", &[("A3", 0.049), ("B3", 0.186), ("C4", 0.668), ("D4", 0.040), ("E4", 0.018), ("F4", 0.009), ("G3", 0.031)]),
            ("D4", &[("A3", 0.023), ("B3", 0.023), ("C4", 0.233), ("D4", 0.349), ("E4", 0.186), ("F4", 0.093), ("G4", 0.093)]),
            ("A3", &[("A3", 0.295), ("B3", 0.361), ("C4", 0.148), ("D4", 0.049), ("F3", 0.016), ("G3", 0.131)]),
            ("E3", &[("A3", 0.250), ("F3", 0.750)]),
            ("F3", &[("D3", 0.125), ("E3", 0.375), ("F3", 0.250), ("G3", 0.250)]),
            ("G4", &[("A4", 0.105), ("B4", 0.026), ("C5", 0.048), ("D4", 0.013), ("E4", 0.071), ("F#4", 0.082), ("F4", 0.107), ("G4", 0.548)]),
            ("F4", &[("A4", 0.062), ("C4", 0.010), ("E4", 0.196), ("F4", 0.320), ("G4", 0.412)]),
            ("A4", &[("A-4", 0.051), ("A4", 0.253), ("B4", 0.051), ("C5", 0.040), ("F#4", 0.020), ("F4", 0.040), ("G4", 0.545)]),
            ("F#4", &[("A4", 0.091), ("D4", 0.015), ("E4", 0.091), ("F#4", 0.439), ("G4", 0.364)]),
            ("B4", &[("A-4", 0.017), ("A4", 0.133), ("B4", 0.183), ("C5", 0.450), ("D5", 0.050), ("G4", 0.167)]),
            ("C5", &[("A4", 0.050), ("B4", 0.275), ("C5", 0.525), ("D5", 0.025), ("E5", 0.017), ("G4", 0.108)]),
            ("D5", &[("B4", 0.125), ("C5", 0.875)]),
            ("E4", &[("A4", 0.017), ("C4", 0.083), ("D4", 0.058), ("E4", 0.492), ("F#4", 0.025), ("F4", 0.117), ("G4", 0.208)]),
            ("E5", &[("D5", 0.500), ("F5", 0.500)]),
            ("F5", &[("E5", 1.000)]),
            ("A-4", &[("A4", 0.833), ("E4", 0.167)]),
            ("D3", &[("G3", 1.000)]),
        ],
    )
}

pub fn tenor_major() -> PitchChain {
    chain(
        ("B2", "A4"),
        ("E3", "E4"),
        &["C3", "E3", "G3", "C4", "E4"],
        &[
            ("E3", &[("A3", 0.029), ("C3", 0.048), ("D3", 0.096), ("E3", 0.288), ("F3", 0.288), ("G3", 0.250)]),
            ("G3", &[("A3", 0.121), ("B3", 0.005), ("C3", 0.030), ("C4", 0.081), ("D3", 0.005), ("D4", 0.005), ("E3", 0.076), ("F3", 0.253), ("G#3", 0.010), ("G3", 0.414)]),
            ("A3", &[("A3", 0.192), ("B3", 0.096), ("C4", 0.096), ("D4", 0.058), ("F#3", 0.019), ("F3", 0.038), ("G#3", 0.019), ("G3", 0.481)]),
            ("F3", &[("A3", 0.018), ("D3", 0.009), ("E3", 0.423), ("F3", 0.198), ("G3", 0.351)]),
            ("D3", &[("B2", 0.062), ("C3", 0.406), ("D3", 0.125), ("E3", 0.375), ("F3", 0.031)]),
            ("B3", &[("A3", 0.033), ("B3", 0.262), ("C4", 0.623), ("D4", 0.016), ("G3", 0.049), ("G4", 0.016)]),
            ("C3", &[("A2", 0.053), ("B2", 0.132), ("C3", 0.211), ("D3", 0.316), ("E3", 0.079), ("F3", 0.158), ("G3", 0.053)]),
            ("B2", &[("C3", 0.778), ("D3", 0.222)]),
            ("A2", &[("B2", 1.000)]),
            ("E4", &[("B3", 0.016), ("C4", 0.121), ("D4", 0.371), ("E-4", 0.008), ("E4", 0.194), ("F4", 0.105), ("G4", 0.185)]),
            ("C4", &[("A3", 0.030), ("B3", 0.108), ("C4", 0.584), ("D4", 0.164), ("E4", 0.052), ("F4", 0.030), ("G3", 0.033)]),
            ("D4", &[("B3", 0.019), ("C#4", 0.026), ("C4", 0.193), ("D4", 0.580), ("E4", 0.145), ("F#4", 0.011), ("G3", 0.004), ("G4", 0.022)]),
            ("C#4", &[("D4", 1.000)]),
            ("G4", &[("A4", 0.032), ("B-4", 0.008), ("C4", 0.016), ("D4", 0.024), ("E4", 0.088), ("F#4", 0.040), ("F4", 0.224), ("G3", 0.016), ("G4", 0.552)]),
            ("F4", &[("C4", 0.066), ("D4", 0.016), ("E4", 0.475), ("F4", 0.180), ("G4", 0.262)]),
            ("A4", &[("G4", 1.000)]),
            ("B-4", &[("A4", 0.500), ("B-4", 0.500)]),
            ("F#4", &[("E4", 0.400), ("F#4", 0.200), ("G4", 0.400)]),
            ("E-4", &[("E4", 1.000)]),
            ("G#3", &[("A3", 0.600), ("G#3", 0.400)]),
            ("F#3", &[("F#3", 0.500), ("G3", 0.500)]),
        ],
    )
}

pub fn bass_major() -> PitchChain {
    chain(
        ("E2", "D4"),
        ("A2", "C4"),
        &["C3", "C4"],
        &[
            ("C3", &[("A2", 0.049), ("A3", 0.003), ("B-2", 0.007), ("B2", 0.026), ("C3", 0.497), ("C4", 0.010), ("D3", 0.098), ("E2", 0.007), ("E3", 0.065), ("F2", 0.042), ("F3", 0.039), ("G2", 0.049), ("G3", 0.108)]),
            ("G2", &[("A2", 0.153), ("B2", 0.020), ("C2", 0.020), ("C3", 0.439), ("F2", 0.071), ("G2", 0.286), ("G3", 0.010)]),
            ("F3", &[("A2", 0.006), ("A3", 0.006), ("C3", 0.114), ("C4", 0.019), ("D3", 0.057), ("E3", 0.196), ("F#3", 0.044), ("F3", 0.380), ("G3", 0.177)]),
            ("B2", &[("A2", 0.125), ("B2", 0.125), ("C3", 0.750)]),
            ("D3", &[("A2", 0.020), ("C#3", 0.007), ("C3", 0.150), ("D3", 0.405), ("E3", 0.222), ("F#3", 0.020), ("F3", 0.033), ("G2", 0.007), ("G3", 0.137)]),
            ("E3", &[("A2", 0.016), ("A3", 0.033), ("C3", 0.090), ("D3", 0.189), ("E3", 0.180), ("F3", 0.426), ("G3", 0.066)]),
            ("A2", &[("A2", 0.132), ("B2", 0.151), ("C3", 0.057), ("D2", 0.113), ("D3", 0.075), ("E2", 0.038), ("F2", 0.019), ("G2", 0.415)]),
            ("G3", &[("A3", 0.026), ("B3", 0.011), ("C3", 0.168), ("C4", 0.073), ("D3", 0.062), ("E3", 0.040), ("F3", 0.059), ("G2", 0.018), ("G3", 0.542)]),
            ("F2", &[("A2", 0.068), ("C3", 0.250), ("E2", 0.068), ("F2", 0.295), ("G2", 0.318)]),
            ("E2", &[("A2", 0.125), ("C2", 0.188), ("D2", 0.062), ("E2", 0.125), ("F2", 0.438), ("G2", 0.062)]),
            ("D2", &[("E2", 1.000)]),
            ("C2", &[("C2", 0.250), ("F2", 0.750)]),
            ("F#3", &[("D3", 0.167), ("G3", 0.833)]),
            ("C4", &[("A3", 0.036), ("B3", 0.095), ("C4", 0.321), ("D4", 0.202), ("E3", 0.012), ("E4", 0.048), ("F3", 0.131), ("F4", 0.012), ("G3", 0.143)]),
            ("E4", &[("B3", 0.038), ("C4", 0.038), ("D4", 0.462), ("E3", 0.038), ("E4", 0.231), ("F4", 0.192)]),
            ("D4", &[("A3", 0.125), ("C4", 0.406), ("D3", 0.062), ("D4", 0.062), ("E-4", 0.031), ("E4", 0.281), ("G3", 0.031)]),
            ("F4", &[("E4", 0.750), ("F4", 0.250)]),
            ("B3", &[("A3", 0.320), ("C4", 0.680)]),
            ("A3", &[("A3", 0.176), ("B3", 0.382), ("C4", 0.029), ("D3", 0.088), ("D4", 0.029), ("E3", 0.029), ("F#3", 0.059), ("G3", 0.206)]),
            ("E-4", &[("E-4", 0.500), ("E4", 0.500)]),
            ("B-2", &[("A2", 1.000)]),
            ("C#3", &[("D3", 1.000)]),
        ],
    )
}

pub fn soprano_minor() -> PitchChain {
    chain(
        ("C4", "A5"),
        ("E4", "E5"),
        &["E4", "A4", "C5", "E5"],
        &[
            ("E4", &[("A4", 0.214), ("B4", 0.190), ("C5", 0.095), ("D4", 0.238), ("E4", 0.119), ("E5", 0.048), ("F4", 0.071), ("G4", 0.024)]),
            ("A4", &[("A4", 0.129), ("B-4", 0.059), ("B4", 0.294), ("C5", 0.094), ("D5", 0.024), ("E4", 0.059), ("E5", 0.035), ("F4", 0.024), ("G4", 0.282)]),
            ("B4", &[("A4", 0.329), ("B4", 0.106), ("C5", 0.412), ("D5", 0.024), ("E4", 0.059), ("G4", 0.071)]),
            ("C5", &[("A4", 0.079), ("B-4", 0.108), ("B4", 0.259), ("C5", 0.158), ("D5", 0.295), ("E-5", 0.007), ("E5", 0.022), ("F5", 0.029), ("G4", 0.036), ("G5", 0.007)]),
            ("G4", &[("A4", 0.333), ("B-4", 0.033), ("B4", 0.067), ("C5", 0.017), ("D5", 0.033), ("E4", 0.067), ("F4", 0.200), ("G4", 0.250)]),
            ("F4", &[("E4", 0.714), ("F4", 0.190), ("G4", 0.095)]),
            ("D5", &[("B-4", 0.070), ("B4", 0.008), ("C5", 0.295), ("D5", 0.318), ("E-5", 0.093), ("E5", 0.124), ("F#5", 0.016), ("F5", 0.031), ("G4", 0.016), ("G5", 0.031)]),
            ("E5", &[("A4", 0.028), ("A5", 0.042), ("C5", 0.167), ("D5", 0.125), ("E4", 0.014), ("E5", 0.458), ("F5", 0.083), ("G5", 0.083)]),
            ("G5", &[("A5", 0.087), ("B-5", 0.043), ("C5", 0.043), ("E5", 0.174), ("F#5", 0.087), ("F5", 0.391), ("G5", 0.174)]),
            ("F5", &[("B-4", 0.061), ("C5", 0.030), ("D5", 0.242), ("E-5", 0.061), ("E5", 0.273), ("F5", 0.242), ("G5", 0.091)]),
            ("A5", &[("D5", 0.167), ("E5", 0.333), ("G5", 0.500)]),
            ("F#5", &[("D5", 0.500), ("G5", 0.500)]),
            ("E-5", &[("C5", 0.190), ("D5", 0.571), ("E-5", 0.143), ("F5", 0.095)]),
            ("B-4", &[("A4", 0.106), ("B-4", 0.277), ("C5", 0.234), ("D5", 0.298), ("E-5", 0.064), ("G4", 0.021)]),
            ("B-5", &[("A5", 1.000)]),
            ("D4", &[("C4", 0.100), ("E4", 0.500), ("G4", 0.400)]),
            ("C4", &[("C4", 1.000)]),
        ],
    )
}

pub fn alto_minor() -> PitchChain {
    chain(
        ("G3", "D5"),
        ("A3", "C5"),
        &["C4", "E4", "A4", "C5"],
        &[
            ("E4", &[("A-4", 0.010), ("A4", 0.060), ("C5", 0.010), ("D4", 0.150), ("E4", 0.570), ("F#4", 0.020), ("F4", 0.060), ("G#4", 0.070), ("G4", 0.050)]),
            ("A4", &[("A-4", 0.033), ("A4", 0.346), ("B-4", 0.052), ("B4", 0.105), ("C5", 0.085), ("E4", 0.111), ("F4", 0.046), ("G4", 0.222)]),
            ("F4", &[("A4", 0.071), ("C5", 0.018), ("D4", 0.089), ("E-4", 0.036), ("E4", 0.161), ("F4", 0.411), ("G4", 0.214)]),
            ("G4", &[("A4", 0.185), ("B-4", 0.036), ("B4", 0.012), ("C5", 0.012), ("D4", 0.012), ("D5", 0.006), ("E-4", 0.012), ("E4", 0.065), ("F#4", 0.071), ("F4", 0.083), ("G4", 0.506)]),
            ("D4", &[("C#4", 0.032), ("C4", 0.161), ("D4", 0.468), ("E4", 0.242), ("F#4", 0.016), ("G4", 0.081)]),
            ("B4", &[("A4", 0.357), ("B4", 0.262), ("C5", 0.262), ("D5", 0.024), ("G4", 0.095)]),
            ("C5", &[("A4", 0.164), ("B-4", 0.127), ("B4", 0.236), ("C5", 0.236), ("D5", 0.055), ("E5", 0.036), ("G4", 0.145)]),
            ("D5", &[("A4", 0.154), ("C5", 0.462), ("D5", 0.231), ("E4", 0.154)]),
            ("A-4", &[("A-4", 0.364), ("A4", 0.455), ("E4", 0.182)]),
            ("F#4", &[("A-4", 0.048), ("D4", 0.048), ("F#4", 0.238), ("F4", 0.048), ("G4", 0.619)]),
            ("E5", &[("D5", 0.125), ("E4", 0.500), ("G#4", 0.375)]),
            ("B-4", &[("A4", 0.353), ("B-4", 0.353), ("C5", 0.088), ("D5", 0.029), ("F#4", 0.029), ("G4", 0.147)]),
            ("E-4", &[("D4", 0.143), ("E-4", 0.429), ("E4", 0.143), ("F4", 0.286)]),
            ("G#4", &[("A4", 0.133), ("D4", 0.133), ("E4", 0.200), ("G#4", 0.533)]),
            ("G5", &[("B4", 0.667), ("G4", 0.333)]),
            ("F5", &[("D4", 1.000)]),
            ("C4", &[("A4", 0.069), ("B3", 0.207), ("C4", 0.448), ("D4", 0.207), ("F4", 0.069)]),
            ("B3", &[("B3", 0.143), ("C4", 0.714), ("F4", 0.143)]),
            ("C#4", &[("D4", 1.000)]),
        ],
    )
}

pub fn tenor_minor() -> PitchChain {
    chain(
        ("B2", "A4"),
        ("C3", "E4"),
        &["E3", "A3", "C4", "E4"],
        &[
            ("E4", &[("A3", 0.011), ("A4", 0.022), ("B3", 0.022), ("C4", 0.140), ("D4", 0.301), ("E4", 0.409), ("F4", 0.022), ("G4", 0.075)]),
            ("C4", &[("A3", 0.057), ("B-3", 0.078), ("B3", 0.248), ("C4", 0.234), ("D4", 0.234), ("E-4", 0.014), ("E4", 0.113), ("F4", 0.014), ("G3", 0.007)]),
            ("D4", &[("A3", 0.015), ("B-3", 0.083), ("B3", 0.015), ("C4", 0.316), ("D4", 0.331), ("E-4", 0.068), ("E4", 0.113), ("F4", 0.045), ("G4", 0.015)]),
            ("B3", &[("A3", 0.351), ("B3", 0.247), ("C4", 0.234), ("E3", 0.026), ("E4", 0.091), ("G#3", 0.013), ("G3", 0.039)]),
            ("A3", &[("A-3", 0.045), ("A3", 0.259), ("B-3", 0.071), ("B3", 0.143), ("C4", 0.062), ("D3", 0.018), ("D4", 0.018), ("E3", 0.018), ("E4", 0.036), ("F#3", 0.018), ("F3", 0.009), ("G#3", 0.062), ("G3", 0.241)]),
            ("A-3", &[("A3", 0.375), ("B3", 0.375), ("E3", 0.250)]),
            ("G4", &[("A-4", 0.043), ("A4", 0.087), ("B-4", 0.022), ("C4", 0.043), ("D4", 0.087), ("E4", 0.130), ("F4", 0.087), ("G4", 0.500)]),
            ("A-4", &[("A-4", 0.600), ("A4", 0.400)]),
            ("A4", &[("A4", 0.167), ("E4", 0.250), ("F#4", 0.167), ("G4", 0.417)]),
            ("G3", &[("A-3", 0.048), ("A3", 0.254), ("B-3", 0.095), ("C4", 0.095), ("D4", 0.032), ("E3", 0.048), ("E4", 0.016), ("F#3", 0.048), ("F3", 0.143), ("G3", 0.222)]),
            ("F3", &[("G3", 1.000)]),
            ("E3", &[("A3", 0.476), ("C4", 0.190), ("E3", 0.333)]),
            ("F#4", &[("F#4", 0.250), ("G4", 0.750)]),
            ("B-3", &[("A3", 0.269), ("B-3", 0.308), ("C4", 0.231), ("D4", 0.115), ("E-4", 0.019), ("F4", 0.019), ("G3", 0.038)]),
            ("E-4", &[("D4", 0.471), ("E-4", 0.118), ("F4", 0.294), ("G4", 0.118)]),
            ("F4", &[("A4", 0.038), ("C4", 0.115), ("D4", 0.192), ("E-4", 0.115), ("E4", 0.115), ("F#4", 0.038), ("F4", 0.231), ("G4", 0.154)]),
            ("B-4", &[("A4", 1.000)]),
            ("F#3", &[("G3", 1.000)]),
            ("G#3", &[("A3", 0.444), ("E3", 0.444), ("G#3", 0.111)]),
            ("D3", &[("G3", 1.000)]),
        ],
    )
}

pub fn bass_minor() -> PitchChain {
    chain(
        ("E2", "D4"),
        ("A2", "C4"),
        &["A2", "C3", "E3", "A3"],
        &[
            ("E4", &[("A3", 0.444), ("E3", 0.333), ("E4", 0.222)]),
            ("A3", &[("A3", 0.423), ("B-3", 0.046), ("B3", 0.054), ("C4", 0.046), ("D3", 0.031), ("E3", 0.085), ("E4", 0.008), ("F3", 0.038), ("G3", 0.269)]),
            ("F3", &[("A3", 0.017), ("B-3", 0.052), ("C3", 0.052), ("D3", 0.121), ("E-3", 0.017), ("E3", 0.259), ("F#3", 0.017), ("F3", 0.241), ("G3", 0.224)]),
            ("D3", &[("A3", 0.026), ("B-3", 0.039), ("C3", 0.039), ("D3", 0.299), ("E-3", 0.026), ("E3", 0.208), ("F3", 0.065), ("G2", 0.026), ("G3", 0.273)]),
            ("E3", &[("A-3", 0.020), ("A2", 0.184), ("A3", 0.245), ("D3", 0.031), ("E3", 0.378), ("E4", 0.020), ("F#3", 0.020), ("F3", 0.102)]),
            ("A-3", &[("A-3", 0.429), ("A3", 0.429), ("F#3", 0.143)]),
            ("G3", &[("A-3", 0.011), ("A2", 0.011), ("A3", 0.119), ("B-3", 0.040), ("B2", 0.011), ("B3", 0.011), ("C3", 0.034), ("C4", 0.028), ("D3", 0.114), ("E-3", 0.006), ("E3", 0.011), ("F3", 0.085), ("G2", 0.011), ("G3", 0.506)]),
            ("C4", &[("A3", 0.061), ("B-3", 0.020), ("B3", 0.102), ("C3", 0.020), ("C4", 0.388), ("D4", 0.204), ("E-4", 0.020), ("E3", 0.020), ("F3", 0.020), ("G3", 0.143)]),
            ("D4", &[("B-3", 0.111), ("C4", 0.167), ("D3", 0.167), ("D4", 0.389), ("E4", 0.167)]),
            ("B3", &[("A3", 0.353), ("B3", 0.176), ("C4", 0.412), ("G3", 0.059)]),
            ("C3", &[("A3", 0.019), ("B2", 0.074), ("C#3", 0.019), ("C3", 0.333), ("C4", 0.019), ("D3", 0.259), ("E3", 0.148), ("F2", 0.037), ("F3", 0.093)]),
            ("F#3", &[("E3", 0.200), ("G3", 0.800)]),
            ("B-3", &[("A3", 0.237), ("B-3", 0.421), ("C4", 0.184), ("G3", 0.158)]),
            ("C#3", &[("C#3", 0.500), ("D3", 0.500)]),
            ("E-3", &[("D3", 0.400), ("E-3", 0.200), ("F3", 0.400)]),
            ("E-4", &[("D4", 1.000)]),
            ("A2", &[("A2", 0.188), ("A3", 0.094), ("B2", 0.219), ("C3", 0.344), ("E3", 0.031), ("F#3", 0.031), ("F3", 0.031), ("G2", 0.062)]),
            ("B2", &[("A2", 0.308), ("C3", 0.538), ("E3", 0.154)]),
            ("G2", &[("A2", 0.231), ("C3", 0.385), ("F2", 0.231), ("G2", 0.154)]),
            ("F2", &[("G2", 1.000)]),
            ("E2", &[("A2", 0.667), ("F2", 0.333)]),
        ],
    )
}

pub fn voice_chain(mode: &str, voice: Voice) -> PitchChain {
    match (mode, voice) {
        ("major", Voice::Soprano) => soprano_major(),
        ("major", Voice::Alto) => alto_major(),
        ("major", Voice::Tenor) => tenor_major(),
        ("major", Voice::Bass) => bass_major(),
        (_, Voice::Soprano) => soprano_minor(),
        (_, Voice::Alto) => alto_minor(),
        (_, Voice::Tenor) => tenor_minor(),
        (_, Voice::Bass) => bass_minor(),
    }
}

/// The melody producer for one voice. Leaf-guarded so it also fills gaps
/// beside cadence claims and regenerated sub-nodes.
pub fn melody_producer(mode: &str, voice: Voice) -> Result<PitchMarkovProducer, GenError> {
    PitchMarkovProducer::new(
        &format!("melody-{}", voice.label()),
        NodeGuard::Leaf,
        0.5,
        voice_chain(mode, voice),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantus_engine::music::Pitch;

    #[test]
    fn test_all_chains_are_closed() {
        // Every transition target is itself a state with an outgoing row,
        // so a walk can never fall off the table.
        for mode in ["major", "minor"] {
            for voice in Voice::ALL {
                let chain = voice_chain(mode, voice);
                for (state, row) in &chain.transitions {
                    assert!(Pitch::parse(state).is_ok(), "bad state {state}");
                    for (next, _) in row {
                        assert!(
                            chain.transitions.contains_key(next),
                            "{mode}/{voice:?}: {state} -> {next} leaves the table"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_initial_states_have_rows() {
        for mode in ["major", "minor"] {
            for voice in Voice::ALL {
                let chain = voice_chain(mode, voice);
                for s in &chain.initial {
                    assert!(chain.transitions.contains_key(s), "{mode}/{voice:?}: initial {s}");
                }
            }
        }
    }

    #[test]
    fn test_ambitus_brackets_initial_ambitus() {
        for mode in ["major", "minor"] {
            for voice in Voice::ALL {
                let chain = voice_chain(mode, voice);
                let lo = Pitch::parse(&chain.ambitus.0).unwrap().midi();
                let hi = Pitch::parse(&chain.ambitus.1).unwrap().midi();
                let lo0 = Pitch::parse(&chain.ambitus_initial.0).unwrap().midi();
                let hi0 = Pitch::parse(&chain.ambitus_initial.1).unwrap().midi();
                assert!(lo <= lo0 && hi0 <= hi);
            }
        }
    }
}
