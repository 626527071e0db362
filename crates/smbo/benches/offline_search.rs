use criterion::{criterion_group, criterion_main, Criterion};
use ndarray_rand::rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use tlbo_smbo::{
    Acquisition, AcquisitionFunction, AcquisitionKind, CandidatePool, GpSurrogate, OfflineSearch,
    SurrogateKind, SurrogateModel,
};
use tlbo_space::{ConfigurationSpace, Hyperparameter};

fn criterion_offline_search(c: &mut Criterion) {
    let space = ConfigurationSpace::new(vec![
        Hyperparameter::float("learning_rate", 1e-4, 1., 1e-2).log_scale(),
        Hyperparameter::int("max_depth", 1, 12, 6),
        Hyperparameter::float("subsample", 0.5, 1., 1.),
        Hyperparameter::categorical("booster", &["gbtree", "dart"], 0),
    ])
    .expect("valid space");
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let configs = space.sample_configurations(2000, &mut rng);
    let perfs = configs
        .iter()
        .map(|c| {
            let v = c.raw_values();
            (v[0].ln() + 4.).powi(2) + 0.1 * v[1] - v[2] + v[3]
        })
        .collect();
    let pool = CandidatePool::new(&space, configs, perfs).expect("valid pool");

    let n_train = 50;
    let (x, y) = pool.successes();
    let mut model = GpSurrogate::new(SurrogateKind::Gp, 0);
    model
        .train(
            &x.slice(ndarray::s![..n_train, ..]),
            &y.slice(ndarray::s![..n_train]),
        )
        .expect("GP trained");
    let eta = y
        .slice(ndarray::s![..n_train])
        .fold(f64::INFINITY, |a, b| a.min(*b));
    let mut acquisition = Acquisition::new(AcquisitionKind::Ei);
    acquisition
        .update(&model, eta, n_train)
        .expect("acquisition updated");
    let mut selected = vec![false; pool.len()];
    selected[..n_train].iter_mut().for_each(|s| *s = true);

    let mut group = c.benchmark_group("offline_search");
    group.sample_size(20);
    group.bench_function("ei over 2000 candidates", |b| {
        let search = OfflineSearch::default();
        b.iter(|| {
            std::hint::black_box(
                search
                    .maximize(&acquisition, &model, &pool, &selected, 1)
                    .expect("search"),
            )
        });
    });
    group.finish();
}

criterion_group!(benches, criterion_offline_search);
criterion_main!(benches);
