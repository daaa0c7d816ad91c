use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use turingforge::dataset::{Dataset, Range};
use turingforge::dispatch::DispatchTable;
use turingforge::function::FunctionCatalog;
use turingforge::individual::Individual;
use turingforge::interpreter::Interpreter;
use turingforge::operators::creator::{BalancedCreator, CreatorOperator};
use turingforge::random::EngineRandomGenerator;

fn wide_dataset(rows: usize, cols: usize) -> Dataset {
    let values: Vec<f64> = (0..rows * cols).map(|i| (i % 97) as f64 * 0.01).collect();
    let arr = Array2::from_shape_vec((rows, cols), values).unwrap();
    let names: Vec<String> = (0..cols).map(|i| format!("x{i}")).collect();
    Dataset::new(arr, &names)
}

fn sample_individual(terms: usize, variables: usize) -> Individual {
    let mut rng = EngineRandomGenerator::new_from_seed(Some(42));
    let creator = BalancedCreator::new(FunctionCatalog::arithmetic());
    creator.create(&mut rng, terms, 3.0, variables, 0)
}

fn bench_evaluate(c: &mut Criterion) {
    let dataset = wide_dataset(4096, 4);
    let dispatch = DispatchTable::new();
    let interpreter = Interpreter::new(&dataset, &dispatch);
    let individual = sample_individual(8, 4);
    let coeff = individual.get_coefficients();
    let range = Range::new(0, dataset.rows()).unwrap();

    c.bench_function("interpreter_evaluate_4096x4", |b| {
        b.iter(|| {
            let predictions = interpreter
                .evaluate(black_box(&individual), black_box(coeff.as_slice()), range)
                .unwrap();
            black_box(predictions);
        })
    });
}

fn bench_jac_rev(c: &mut Criterion) {
    let dataset = wide_dataset(4096, 4);
    let dispatch = DispatchTable::new();
    let interpreter = Interpreter::new(&dataset, &dispatch);
    let individual = sample_individual(8, 4);
    let coeff = individual.get_coefficients();
    let range = Range::new(0, dataset.rows()).unwrap();

    c.bench_function("interpreter_jac_rev_4096x4", |b| {
        b.iter(|| {
            let jac = interpreter
                .jac_rev(black_box(&individual), black_box(coeff.as_slice()), range)
                .unwrap();
            black_box(jac);
        })
    });
}

fn bench_batch_size_sensitivity(c: &mut Criterion) {
    let dataset = wide_dataset(8192, 2);
    let dispatch = DispatchTable::new();
    let individual = sample_individual(4, 2);
    let coeff = individual.get_coefficients();
    let range = Range::new(0, dataset.rows()).unwrap();

    let mut group = c.benchmark_group("interpreter_batch_size");
    for batch_size in [16usize, 64, 512, 4096] {
        let interpreter = Interpreter::new(&dataset, &dispatch).with_batch_size(batch_size);
        group.bench_function(format!("batch_{batch_size}"), |b| {
            b.iter(|| {
                let predictions = interpreter
                    .evaluate(black_box(&individual), black_box(coeff.as_slice()), range)
                    .unwrap();
                black_box(predictions);
            })
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = bench_evaluate, bench_jac_rev, bench_batch_size_sensitivity
}
criterion_main!(benches);
