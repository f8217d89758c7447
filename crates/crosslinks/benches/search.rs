use crosslinks::{
    BridgeChemistry, DigestedFragment, FragmentPool, LinkSite, ObservedPeak, SearchSettings, Tolerance,
    combination_shapes, search,
};
use divan::{AllocProfiler, black_box};
use formula::{AtomicDatabase, ElementalFormula, MassType};
use once_cell::sync::Lazy;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

static ATOMIC_DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

static DSS: Lazy<BridgeChemistry> = Lazy::new(|| {
    BridgeChemistry::new(
        &ATOMIC_DB,
        MassType::Monoisotopic,
        "DSS",
        "C8H10O2",
        3,
        vec![LinkSite::Residue('K'), LinkSite::ProteinNTerm],
        Vec::new(),
    )
    .unwrap()
});

static FRAGMENTS: Lazy<Vec<DigestedFragment>> = Lazy::new(|| {
    let residue = |formula| ElementalFormula::new(formula).unwrap();
    let (gly, lys, ala) = (residue("C2H3NO"), residue("C6H12N2O"), residue("C3H5NO"));
    let water = residue("H2O");

    let mut fragments = Vec::new();
    let mut start = 1;
    for glycines in 1..8 {
        for lysines in 0..4 {
            for alanines in 0..6 {
                let sequence = format!(
                    "{}{}{}",
                    "G".repeat(glycines),
                    "K".repeat(lysines),
                    "A".repeat(alanines)
                );
                let mut formula = water.clone();
                formula += &(&gly * glycines as i64);
                formula += &(&lys * lysines as i64);
                formula += &(&ala * alanines as i64);
                let end = start + sequence.len() - 1;
                fragments.push(DigestedFragment::new(sequence, 0, start, end, formula, ""));
                start = end + 1;
            }
        }
    }
    fragments
});

static POOL: Lazy<FragmentPool> = Lazy::new(build_pool);

static PEAKS: Lazy<Vec<ObservedPeak>> = Lazy::new(|| {
    (0..20)
        .map(|i| ObservedPeak::new(900.0 + 97.3 * f64::from(i), Tolerance::Ppm(10.0), 1, 1.0))
        .collect()
});

fn main() {
    Lazy::force(&DSS);
    Lazy::force(&POOL);
    Lazy::force(&PEAKS);
    divan::main();
}

#[divan::bench]
fn build_pool() -> FragmentPool {
    FragmentPool::build(
        FRAGMENTS.iter().cloned(),
        &DSS,
        &ATOMIC_DB,
        MassType::Monoisotopic,
        4000.0,
    )
}

#[divan::bench]
fn generate_shapes() {
    black_box(combination_shapes(black_box(4), black_box(6)));
}

#[divan::bench]
fn search_peaks() {
    let settings = SearchSettings::new(DSS.clone());
    black_box(search(&POOL, &PEAKS, &settings));
}
