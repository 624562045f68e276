use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use nullcue_core::{ColourName, Congruency, CueColour, Frame, Palette, TargetSide, TrialSpec};
use nullcue_experiment::{generate_characteristics, Monitor, Scene};
use nullcue_render::SkiaRenderer;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn frames() -> Vec<(&'static str, Frame)> {
    let monitor = Monitor::lab();
    let scene = Scene::new(&monitor);
    let palette = Palette::new(ColourName::Blue, ColourName::Green, ColourName::Orange).unwrap();
    let spec = TrialSpec::new(CueColour::First, Congruency::Incongruent, TargetSide::Right).unwrap();
    let stimulus = generate_characteristics(&spec, &palette, &mut StdRng::seed_from_u64(1));

    vec![
        ("fixation", scene.fixation(None, None)),
        ("stimuli", scene.stimuli(&stimulus, None)),
        ("dial", scene.dial(Some(stimulus.target_colour.rgb()), 0.7, None, None)),
    ]
}

fn harness() -> (SkiaRenderer, Vec<u8>) {
    let (width, height) = Monitor::lab().resolution;
    let r = SkiaRenderer::new(width, height, None).unwrap();
    let fb = vec![0u8; (width * height * 4) as usize];
    (r, fb)
}

pub fn bench_frames(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    for (name, frame) in frames() {
        g.bench_function(name, |b| {
            b.iter_batched(
                harness,
                |(mut r, mut fb)| {
                    let stats = r.render_frame(&frame, &mut fb);
                    black_box(stats)
                },
                BatchSize::LargeInput,
            )
        });
    }

    g.finish();
}

criterion_group!(benches, bench_frames);
criterion_main!(benches);
