use manuallabour::model::{RawFileReference, RawImageReference};
use manuallabour::store::LocalMemoryStore;

use crate::builders::{ObjectBuilder, RefBuilder, StepBuilder};

/// Store with four steps sharing a tool (`ta`), a part (`pa`) and a
/// result (`ra`).
///
/// - `a`: 15 min, uses 1 `ta` and 2 `pa`, creates `ra`; image `imb` with
///   source file `rwth`
/// - `b`: 15 min, uses 3 `ta`, consumes `ra`, optionally 1 `pa`; file `fb`
/// - `c`: 15 min, consumes 3 `pa`
/// - `d`: no duration, consumes 3 `pa`
///
/// Blob paths are bogus; the store does not check them.
pub fn schedule_example() -> LocalMemoryStore {
    let mut store = LocalMemoryStore::new();

    store.add_blob("imb", "foo.png").unwrap();
    store.add_blob("fb", "../t.tmp").unwrap();
    store.add_blob("imb2", "b.png").unwrap();
    store.add_blob("rwth", "source.src").unwrap();

    store
        .add_obj(ObjectBuilder::new("ta", "Tool A").build())
        .unwrap();
    store
        .add_obj(
            ObjectBuilder::new("pa", "Part A")
                .image("imb2", "boo", ".png")
                .build(),
        )
        .unwrap();
    store
        .add_obj(ObjectBuilder::new("ra", "Result A").build())
        .unwrap();

    let image = RawImageReference {
        blob_id: "imb".to_string(),
        alt: "Foo".to_string(),
        extension: ".png".to_string(),
        sourcefiles: Some(vec![RawFileReference {
            blob_id: "rwth".to_string(),
            filename: "source.src".to_string(),
        }]),
    };

    store
        .add_step(
            StepBuilder::new("a", "First")
                .description("Whack {{part(a)}} with {{tool(a)}} to get {{result(a)}}")
                .minutes(15)
                .image("t_imag", image)
                .tool("a", RefBuilder::new("ta"))
                .part("a", RefBuilder::new("pa").quantity(2))
                .result("a", RefBuilder::new("ra").created())
                .build(),
        )
        .unwrap();
    store
        .add_step(
            StepBuilder::new("b", "Second")
                .description("Use all {{tool(a)}} to fix {{part(a)}} to {{part(b)}}")
                .minutes(15)
                .file("t_imag", "fb", "test.tmp")
                .tool("a", RefBuilder::new("ta").quantity(3))
                .part("b", RefBuilder::new("ra"))
                .part("a", RefBuilder::new("pa").optional())
                .build(),
        )
        .unwrap();
    store
        .add_step(
            StepBuilder::new("c", "Third")
                .description("Add {{part(a)}}")
                .minutes(15)
                .part("a", RefBuilder::new("pa").quantity(3))
                .build(),
        )
        .unwrap();
    store
        .add_step(
            StepBuilder::new("d", "Third")
                .description("Add {{part(a)}}")
                .part("a", RefBuilder::new("pa").quantity(3))
                .build(),
        )
        .unwrap();

    store
}
