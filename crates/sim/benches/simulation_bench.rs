use santa_sim::simulation::{Configuration, Simulation};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

fn config(population: usize, length: usize, storage: &str, generations: usize) -> Configuration {
    let text = format!(
        r#"{{
            "seed": 17,
            "population": {{ "initial_size": {population} }},
            "genome": {{
                "random_length": {length},
                "storage": "{storage}",
                "features": [
                    {{ "name": "gene", "type": "amino_acid", "fragments": [[0, {cds}]] }}
                ]
            }},
            "fitness": [
                {{ "kind": "purifying", "feature": "gene", "selection_coefficient": 0.1 }}
            ],
            "mutator": {{
                "substitution_rate": 0.0001,
                "indel": {{ "insertion_rate": 0.00001, "deletion_rate": 0.00001 }}
            }},
            "replicator": {{
                "type": "recombinant",
                "recombination_probability": 0.1,
                "breakpoint_probability": 0.0005
            }},
            "epochs": [{{ "generations": {generations} }}]
        }}"#,
        cds = length / 3 * 3,
    );
    Configuration::from_json_str(&text).unwrap()
}

fn bench_simulation_init(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_init");
    let config = config(1_000, 3_000, "diff", 10);

    group.bench_function("from_config", |b| {
        b.iter(|| black_box(Simulation::from_config(black_box(&config)).unwrap()))
    });

    group.finish();
}

fn bench_simulation_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_step");
    let pop_size = 1_000;

    group.throughput(Throughput::Elements(pop_size as u64));

    for storage in ["full", "diff"] {
        let config = config(pop_size, 3_000, storage, 10);
        group.bench_function(BenchmarkId::new("step", storage), |b| {
            b.iter_batched(
                || Simulation::from_config(&config).unwrap(),
                |mut sim| {
                    sim.step().unwrap();
                    black_box(sim)
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_simulation_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_run");
    let pop_size = 500;
    let generations = 20;

    group.throughput(Throughput::Elements((pop_size * generations) as u64));

    group.bench_with_input(
        BenchmarkId::new("run_diff", generations),
        &generations,
        |b, &gens| {
            let config = config(pop_size, 3_000, "diff", gens);
            b.iter_batched(
                || Simulation::from_config(&config).unwrap(),
                |mut sim| {
                    sim.run().unwrap();
                    black_box(sim)
                },
                criterion::BatchSize::SmallInput,
            )
        },
    );

    group.finish();
}

criterion_group!(
    benches,
    bench_simulation_init,
    bench_simulation_step,
    bench_simulation_run
);
criterion_main!(benches);
