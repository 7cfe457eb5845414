//! Level and band-energy dump for checking stems before a mix

use fixmymix::{AudioSignal, BandEnergies, FrequencyBand, SnapshotAnalyser, StereoBuffer};
use fixmymix::signal::rms_to_db;
use std::env;

/// Seconds between the snapshots averaged into the band table
const SNAPSHOT_INTERVAL: f64 = 1.0;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: level_detail <file1> [file2 ...]");
        std::process::exit(1);
    }

    let mut failed = false;
    for path in &args[1..] {
        println!("\n{}", "=".repeat(60));
        println!("FILE: {}", path);
        println!("{}", "=".repeat(60));

        match AudioSignal::decode_file(path) {
            Ok(signal) => print_levels(&signal),
            Err(e) => {
                eprintln!("Failed to decode: {}", e);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

fn print_levels(signal: &AudioSignal) {
    println!("Sample rate: {} Hz", signal.sample_rate());
    println!(
        "Frames: {} ({:.2}s), channels: {}",
        signal.frames(),
        signal.duration_secs(),
        signal.channel_count()
    );

    println!("\nLevels:");
    println!("{:>10} {:>10} {:>10} {:>10}", "Channel", "RMS", "Peak", "dB");
    for (i, channel) in signal.channels().iter().enumerate() {
        let rms = fixmymix::signal::rms(channel);
        let peak = fixmymix::signal::peak(channel);
        println!("{:>10} {:>10.4} {:>10.4} {:>10.1}", i, rms, peak, rms_to_db(rms));
    }
    println!(
        "{:>10} {:>10.4} {:>10.4} {:>10.1}",
        "all",
        signal.rms(),
        signal.peak(),
        rms_to_db(signal.rms())
    );

    let stereo: StereoBuffer = signal.to_stereo(signal.sample_rate());
    let side: Vec<f32> = stereo
        .left
        .iter()
        .zip(&stereo.right)
        .map(|(l, r)| (l - r) * 0.5)
        .collect();
    println!(
        "Side energy: {:.1} dB",
        rms_to_db(fixmymix::signal::rms(&side))
    );

    let bands = average_bands(signal);
    println!("\nAverage band energy (0-255 scale):");
    for band in FrequencyBand::ALL {
        let (lo, hi) = band.range_hz();
        let energy = bands.get(band);
        println!(
            "  {:<11} {:>5.0}-{:<5.0}Hz {:>6.1}  {}",
            band.name(),
            lo,
            hi,
            energy,
            "#".repeat((energy / 8.0).round() as usize)
        );
    }
    println!("  Variance: {:.1}", bands.variance());
}

/// Mean band energies over snapshots taken every second
fn average_bands(signal: &AudioSignal) -> BandEnergies {
    let mut times = SnapshotAnalyser::timeline(signal, SNAPSHOT_INTERVAL);
    if times.is_empty() {
        times.push(signal.duration_secs());
    }

    let mut analyser = SnapshotAnalyser::new();
    let mut sums = [0.0f64; 7];
    for &time in &times {
        let snapshot = analyser.capture(signal, time);
        let bands = BandEnergies::measure(&snapshot.frequency, snapshot.sample_rate);
        for (sum, value) in sums.iter_mut().zip(bands.values()) {
            *sum += value;
        }
    }

    let count = times.len() as f64;
    BandEnergies::new(sums.map(|s| s / count))
}
