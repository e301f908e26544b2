//! Recursion stubs observed through a whole build

use retort_core::morphing::{LoadErrorKind, Loader, LoaderRequest};
use retort_core::provider::{Mediator, ProvideError, ProvideResult};
use retort_core::types::{ClassDef, TypeExpr};
use retort_core::{Provider, Retort, Value};
use std::sync::{Arc, Mutex};

/// Loads `link` sites with the loader of `target` and keeps the first one it receives
#[derive(Debug)]
struct CapturingLinkProvider {
    link: TypeExpr,
    target: TypeExpr,
    captured: Arc<Mutex<Option<Loader>>>,
}

impl Provider for CapturingLinkProvider {
    fn provide_loader(&self, mediator: &Mediator<'_>, request: &LoaderRequest) -> ProvideResult<Loader> {
        if request.last_type() != &self.link {
            return Err(ProvideError::skip());
        }
        let loader = mediator.provide(&request.with_last_type(self.target.clone()))?;
        self.captured.lock().unwrap().get_or_insert_with(|| loader.clone());
        Ok(loader)
    }
}

#[test]
fn test_failed_build_poisons_recursion_stub() {
    let link = ClassDef::opaque("Link").build();
    let blob = ClassDef::opaque("Blob").build();
    let node = ClassDef::record("Node")
        .field("value", TypeExpr::int())
        .field("link", &link)
        .field("blob", &blob)
        .build();
    let captured = Arc::new(Mutex::new(None));
    let retort = Retort::with_recipe([Arc::new(CapturingLinkProvider {
        link: TypeExpr::from(&link),
        target: TypeExpr::from(&node),
        captured: captured.clone(),
    }) as Arc<dyn Provider>]);

    let err = retort.get_loader(&node).unwrap_err();
    assert!(!err.is_runtime(), "{:?}", err);

    let stub = captured.lock().unwrap().take().expect("the nested node loader was stubbed");
    let err = stub.call(&Value::dict([("value", Value::Int(1))])).unwrap_err();
    assert!(matches!(err.kind, LoadErrorKind::RecursionAborted { .. }), "{:?}", err);
}

#[test]
fn test_completed_build_fills_recursion_stub() {
    let link = ClassDef::opaque("Link").build();
    let node = ClassDef::record("Node")
        .field("value", TypeExpr::int())
        .field("link", TypeExpr::optional(TypeExpr::from(&link)))
        .build();
    let captured = Arc::new(Mutex::new(None));
    let retort = Retort::with_recipe([Arc::new(CapturingLinkProvider {
        link: TypeExpr::from(&link),
        target: TypeExpr::from(&node),
        captured,
    }) as Arc<dyn Provider>]);

    let data = Value::dict([
        ("value", Value::Int(1)),
        ("link", Value::dict([("value", Value::Int(2)), ("link", Value::None)])),
    ]);
    let model = retort.load(&data, &node).unwrap();
    let inner = model.get_attr("link").unwrap();
    assert_eq!(inner.get_attr("value"), Some(&Value::Int(2)));
}
