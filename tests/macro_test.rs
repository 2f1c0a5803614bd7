#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use transcopy::{CopyEngine, Reflect, Result, Transcopy};

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Foo {
    int_value: i32,
    long_value: i64,
    bool_value: bool,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Bar {
    #[transcopy(alias = "int_value")]
    i_val: i32,
    long_value: i64,
    bool_value: bool,
}

#[test]
fn test_alias_scenario() -> Result<()> {
    let foo = Foo {
        int_value: 1,
        long_value: 2,
        bool_value: true,
    };
    let bar: Bar = Transcopy::copy_as(&foo)?;
    assert_eq!(
        bar,
        Bar {
            i_val: 1,
            long_value: 2,
            bool_value: true
        }
    );
    Ok(())
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Invoice {
    #[transcopy(alias = " Total ")]
    amount: f64,
    currency: String,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Summary {
    total: f64,
    #[transcopy(alias = "CURRENCY")]
    code: String,
}

#[test]
fn test_alias_is_trimmed_and_case_insensitive() -> Result<()> {
    let invoice = Invoice {
        amount: 12.5,
        currency: "EUR".into(),
    };
    let summary: Summary = Transcopy::copy_as(&invoice)?;
    assert_eq!(summary.total, 12.5);
    assert_eq!(summary.code, "EUR");
    Ok(())
}

#[derive(Reflect, Debug, Clone, PartialEq)]
#[transcopy(exclusions("internal_note"))]
struct Account {
    id: u64,
    #[transcopy(exclude)]
    password: String,
    internal_note: String,
    owner: String,
    region: String,
    created_by: String,
}

#[derive(Reflect, Debug, Clone, PartialEq, Default)]
#[transcopy(exclusions("region"), constructor_exclude("created_by"))]
struct AccountView {
    id: u64,
    password: String,
    internal_note: String,
    #[transcopy(exclude)]
    owner: String,
    region: String,
    created_by: String,
}

fn account() -> Account {
    Account {
        id: 7,
        password: "hunter2".into(),
        internal_note: "vip".into(),
        owner: "ada".into(),
        region: "eu".into(),
        created_by: "admin".into(),
    }
}

#[test]
fn test_every_exclusion_source_applies() -> Result<()> {
    let view: AccountView = Transcopy::copy_as(&account())?;
    assert_eq!(
        view,
        AccountView {
            id: 7,
            ..AccountView::default()
        }
    );
    Ok(())
}

#[test]
fn test_destination_only_exclusion_does_not_apply_as_source() -> Result<()> {
    let view = AccountView {
        id: 1,
        created_by: "root".into(),
        ..AccountView::default()
    };
    let mut target = account();
    Transcopy::copy_into(&view, &mut target)?;

    // `region` and `internal_note` stay excluded: type-level lists apply on both sides.
    assert_eq!(target.id, 1);
    assert_eq!(target.created_by, "root");
    assert_eq!(target.region, "eu");
    assert_eq!(target.internal_note, "vip");
    assert_eq!(target.password, "hunter2");
    assert_eq!(target.owner, "ada");
    Ok(())
}

#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
enum Status {
    Active,
    Inactive,
}

#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
enum State {
    #[transcopy(rename = "Active")]
    Running,
    Paused,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Job {
    status: Status,
    label: Status,
    fallback: Status,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct JobView {
    status: State,
    label: String,
    fallback: Option<State>,
}

#[test]
fn test_enums_convert_by_constant_name() -> Result<()> {
    let job = Job {
        status: Status::Active,
        label: Status::Inactive,
        fallback: Status::Inactive,
    };
    let view: JobView = Transcopy::copy_as(&job)?;
    assert_eq!(view.status, State::Running);
    assert_eq!(view.label, "Inactive");
    assert_eq!(view.fallback, None);
    Ok(())
}

#[test]
fn test_enum_copy_keeps_the_constant() -> Result<()> {
    let job = Job {
        status: Status::Inactive,
        label: Status::Active,
        fallback: Status::Active,
    };
    assert_eq!(Transcopy::copy(&job)?, job);
    Ok(())
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Cell {
    value: i32,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct WideCell {
    value: i64,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Grid {
    cells: Vec<Vec<Vec<Cell>>>,
    by_name: HashMap<String, Vec<Cell>>,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct WideGrid {
    cells: Vec<Vec<Vec<WideCell>>>,
    by_name: HashMap<String, Vec<WideCell>>,
}

#[test]
fn test_nested_containers_convert_every_leaf() -> Result<()> {
    let cell = |value| Cell { value };
    let grid = Grid {
        cells: vec![
            vec![vec![cell(1), cell(2)], vec![]],
            vec![vec![cell(3)]],
            vec![],
        ],
        by_name: [("a".to_string(), vec![cell(4), cell(5)])].into(),
    };

    let wide: WideGrid = Transcopy::copy_as(&grid)?;

    let shape: Vec<Vec<usize>> = wide
        .cells
        .iter()
        .map(|plane| plane.iter().map(Vec::len).collect())
        .collect();
    assert_eq!(shape, vec![vec![2, 0], vec![1], vec![]]);

    let values: Vec<i64> = wide.cells.iter().flatten().flatten().map(|c| c.value).collect();
    assert_eq!(values, vec![1, 2, 3]);
    assert_eq!(
        wide.by_name["a"],
        vec![WideCell { value: 4 }, WideCell { value: 5 }]
    );
    Ok(())
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Tags {
    names: HashSet<String>,
    scores: Vec<i32>,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct TagList {
    names: Vec<String>,
    scores: VecDeque<i64>,
}

#[test]
fn test_container_kind_mismatch_yields_the_default() -> Result<()> {
    let tags = Tags {
        names: ["a".to_string(), "b".to_string()].into(),
        scores: vec![1, 2],
    };
    let list: TagList = Transcopy::copy_as(&tags)?;
    // Set into list resets the destination to its default.
    assert!(list.names.is_empty());
    // List into deque as well.
    assert!(list.scores.is_empty());
    Ok(())
}

#[test]
fn test_container_kind_mismatch_clears_copy_into_target() -> Result<()> {
    let tags = Tags {
        names: ["fresh".to_string()].into(),
        scores: vec![5],
    };
    let mut list = TagList {
        names: vec!["stale".into()],
        scores: [9].into(),
    };
    Transcopy::copy_into(&tags, &mut list)?;
    assert!(list.names.is_empty());
    assert!(list.scores.is_empty());
    Ok(())
}

#[test]
fn test_large_sets_copy_in_linear_time() -> Result<()> {
    #[derive(Reflect, Debug, PartialEq)]
    struct Bag {
        names: HashSet<String>,
        ids: BTreeMap<u32, String>,
    }

    let bag = Bag {
        names: (0..20_000).map(|i| format!("name-{i}")).collect(),
        ids: (0..20_000).map(|i| (i, format!("id-{i}"))).collect(),
    };
    let started = std::time::Instant::now();
    let copy = Transcopy::copy(&bag)?;
    let elapsed = started.elapsed();

    assert_eq!(copy, bag);
    // A quadratic membership check takes minutes at this size.
    assert!(elapsed < std::time::Duration::from_secs(30), "copy took {elapsed:?}");
    Ok(())
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Inventory {
    items: Vec<String>,
    prices: BTreeMap<String, f64>,
    counts: Vec<i32>,
}

#[test]
fn test_empty_containers_round_trip() -> Result<()> {
    let empty = Inventory {
        items: Vec::new(),
        prices: BTreeMap::new(),
        counts: Vec::new(),
    };
    assert_eq!(Transcopy::copy(&empty)?, empty);
    Ok(())
}

#[test]
fn test_numeric_elements_are_widened() -> Result<()> {
    #[derive(Reflect, Debug, PartialEq)]
    struct Wide {
        counts: Vec<i64>,
    }

    let inventory = Inventory {
        items: vec!["x".into()],
        prices: BTreeMap::new(),
        counts: vec![3, -4],
    };
    let wide: Wide = Transcopy::copy_as(&inventory)?;
    assert_eq!(wide.counts, vec![3, -4]);
    Ok(())
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Nullable {
    retries: Option<i32>,
    limit: i32,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Strict {
    retries: i32,
    limit: Option<i32>,
}

#[test]
fn test_boxed_and_primitive_boundary() -> Result<()> {
    let source = Nullable {
        retries: None,
        limit: 0,
    };
    let strict: Strict = Transcopy::copy_as(&source)?;
    assert_eq!(strict.retries, 0);
    assert_eq!(strict.limit, None);

    let source = Nullable {
        retries: Some(3),
        limit: 9,
    };
    let strict: Strict = Transcopy::copy_as(&source)?;
    assert_eq!(
        strict,
        Strict {
            retries: 3,
            limit: Some(9)
        }
    );
    Ok(())
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Reading {
    value: f64,
    scale: f32,
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Sensor {
    last: Reading,
    history: Vec<Option<f64>>,
    peaks: BTreeMap<String, f64>,
}

#[test]
fn test_non_finite_floats_are_copied() -> Result<()> {
    let sensor = Sensor {
        last: Reading {
            value: f64::NAN,
            scale: f32::NEG_INFINITY,
        },
        history: vec![Some(f64::INFINITY), None, Some(f64::NEG_INFINITY), Some(1.25)],
        peaks: [("max".to_string(), f64::INFINITY)].into(),
    };

    let copy = Transcopy::copy(&sensor)?;
    assert!(copy.last.value.is_nan());
    assert_eq!(copy.last.scale, f32::NEG_INFINITY);
    assert_eq!(copy.history, sensor.history);
    assert_eq!(copy.peaks, sensor.peaks);
    Ok(())
}

#[derive(Reflect, Debug, Clone, PartialEq)]
struct Node {
    name: String,
    children: Vec<Node>,
    meta: BTreeMap<String, Vec<String>>,
}

#[test]
fn test_copy_is_independent_of_the_source() -> Result<()> {
    let source = Node {
        name: "root".into(),
        children: vec![Node {
            name: "leaf".into(),
            children: Vec::new(),
            meta: BTreeMap::new(),
        }],
        meta: [("k".to_string(), vec!["v".to_string()])].into(),
    };

    let mut copy = Transcopy::copy(&source)?;
    assert_eq!(copy, source);

    copy.children[0].name.push('!');
    copy.meta.entry("k".into()).or_default().push("w".into());
    assert_eq!(source.children[0].name, "leaf");
    assert_eq!(source.meta["k"], vec!["v".to_string()]);
    Ok(())
}

#[test]
fn test_batch_helpers() -> Result<()> {
    let foos = [
        Foo {
            int_value: 1,
            long_value: 10,
            bool_value: false,
        },
        Foo {
            int_value: 2,
            long_value: 20,
            bool_value: true,
        },
    ];
    let copies = Transcopy::copy_all(&foos)?;
    assert_eq!(copies, foos.to_vec());

    let bars: VecDeque<Bar> = Transcopy::copy_all_collect::<_, Bar, _>(&foos)?;
    assert_eq!(bars.iter().map(|b| b.i_val).collect::<Vec<_>>(), vec![1, 2]);

    let empty: [Foo; 0] = [];
    assert!(Transcopy::copy_all_as::<Foo, Bar>(&empty).is_err());
    Ok(())
}

#[derive(Reflect, Debug, Clone, PartialEq)]
#[transcopy(name = "billing::Customer")]
struct Customer {
    id: u32,
}

#[test]
fn test_explicit_type_name_and_isolated_engine() -> Result<()> {
    let engine = CopyEngine::new();
    engine.register::<Customer>()?;
    assert!(engine.registry().contains(&"billing::Customer".into()));

    let copy = engine.copy_typed(&Customer { id: 5 })?;
    assert_eq!(copy, Customer { id: 5 });
    assert_eq!(engine.cache().pair_count(), 1);
    Ok(())
}

#[test]
fn test_derived_registration_is_idempotent() -> Result<()> {
    let engine = CopyEngine::new();
    engine.register::<Grid>()?;
    engine.register::<Grid>()?;
    assert!(engine.registry().struct_schema(&"macro_test::Cell".into()).is_some());
    Ok(())
}

#[test]
fn test_same_default_name_with_other_fields_is_rejected() -> Result<()> {
    fn register_flat(engine: &CopyEngine) -> Result<()> {
        #[allow(dead_code)]
        #[derive(Reflect)]
        struct Point {
            x: i32,
        }
        engine.register::<Point>()
    }

    fn register_spatial(engine: &CopyEngine) -> Result<()> {
        #[allow(dead_code)]
        #[derive(Reflect)]
        struct Point {
            x: i32,
            y: i32,
        }
        engine.register::<Point>()
    }

    let engine = CopyEngine::new();
    register_flat(&engine)?;
    register_flat(&engine)?;
    let clash = register_spatial(&engine);
    assert!(matches!(clash, Err(transcopy::CopyError::InvalidInput(_))), "{clash:?}");
    Ok(())
}

