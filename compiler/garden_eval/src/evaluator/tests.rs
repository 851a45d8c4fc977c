use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;
use crate::effects::EffectPolicy;

struct Fixture {
    store: NodeStore,
    cache: EvalCache,
    graph: DependencyGraph,
    effects: EffectRegistry,
    config: EngineConfig,
    cancel: CancelToken,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            store: NodeStore::new(),
            cache: EvalCache::new(),
            graph: DependencyGraph::new(),
            effects: EffectRegistry::new(),
            config: EngineConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(
            Context {
                store: &self.store,
                cache: &self.cache,
                graph: &self.graph,
                effects: &self.effects,
                persistence: None,
                config: &self.config,
                cancel: &self.cancel,
            },
            1,
        )
    }

    fn read(&self, source: &str) -> NodeId {
        garden_parse::parse_expr(source, &self.store).unwrap()
    }

    fn eval_in(&self, source: &str, env: &Environment) -> Evaluated {
        let id = self.read(source);
        self.evaluator().evaluate(id, env).unwrap()
    }

    fn eval(&self, source: &str) -> EvalResult {
        self.eval_in(source, &Environment::new()).result
    }

    /// Environment binding `name` to the literal `value`, stamped `generation`.
    fn bind(&self, env: &Environment, name: &str, value: i64, generation: u64) -> Environment {
        let target = self.read(&value.to_string());
        env.extend([(
            self.store.name(name),
            Binding::ready(target, Ok(Value::Int(value)), Generation::new(generation)),
        )])
    }
}

#[test]
fn test_arithmetic() {
    let fx = Fixture::new();
    assert_eq!(fx.eval("(+ 1 (* 2 3))"), Ok(Value::Int(7)));
    assert_eq!(fx.eval("(/ 7 2)"), Ok(Value::Int(3)));
    assert_eq!(fx.eval("(< 1 2.5)"), Ok(Value::Bool(true)));
}

#[test]
fn test_collections() {
    let fx = Fixture::new();
    assert_eq!(
        fx.eval("[1 (+ 1 1)]"),
        Ok(Value::list(vec![Value::Int(1), Value::Int(2)]))
    );
    assert_eq!(
        fx.eval("#{1 1 2}"),
        Ok(Value::set([Value::Int(1), Value::Int(2)]))
    );
    assert_eq!(
        fx.eval(r#"(get {"a" 1 "b" 2} "b")"#),
        Ok(Value::Int(2))
    );
}

#[test]
fn test_map_rejects_duplicate_keys() {
    let fx = Fixture::new();
    assert_eq!(
        fx.eval(r#"{1 "a" 1 "b"}"#),
        Err(errors::invalid_argument("map", "duplicate key 1"))
    );
    assert_eq!(
        fx.eval(r#"{1 "a" (- 3 2) "b"}"#),
        Err(errors::invalid_argument("map", "duplicate key 1"))
    );
}

#[test]
fn test_signed_zero_equality() {
    let fx = Fixture::new();
    assert_eq!(fx.eval("(= 0.0 (- 0.0))"), Ok(Value::Bool(true)));
    assert_eq!(fx.eval("(= 0 (- 0.0))"), Ok(Value::Bool(true)));
    assert_eq!(fx.eval("(< (- 0.0) 0.0)"), Ok(Value::Bool(false)));
}

#[test]
fn test_let_shadows_outer_binding() {
    let fx = Fixture::new();
    assert_eq!(fx.eval("(let x 1 (let x (+ x 1) x))"), Ok(Value::Int(2)));
}

#[test]
fn test_let_is_not_recursive() {
    let fx = Fixture::new();
    assert_eq!(
        fx.eval("(let a (+ a 1) a)"),
        Err(errors::unresolved_symbol("a"))
    );
}

#[test]
fn test_let_value_error_short_circuits() {
    let fx = Fixture::new();
    assert_eq!(
        fx.eval("(let a (/ 1 0) (str.upper 1))"),
        Err(errors::division_by_zero())
    );
}

#[test]
fn test_free_reads_are_recorded() {
    let fx = Fixture::new();
    let env = fx.bind(&Environment::new(), "y", 4, 7);
    let evaluated = fx.eval_in("(+ y 1)", &env);

    assert_eq!(evaluated.result, Ok(Value::Int(5)));
    assert_eq!(evaluated.reads.len(), 1);
    let read = evaluated.reads[0];
    assert_eq!(read.name, fx.store.name("y"));
    assert_eq!(read.target, env.resolve(fx.store.name("y")));
    assert_eq!(read.generation, Generation::new(7));
}

#[test]
fn test_bound_reads_do_not_escape() {
    let fx = Fixture::new();
    let evaluated = fx.eval_in("(let x 1 (+ x 1))", &Environment::new());
    assert_eq!(evaluated.result, Ok(Value::Int(2)));
    assert!(evaluated.reads.is_empty());
}

#[test]
fn test_unbound_read_is_negative_dependency() {
    let fx = Fixture::new();
    let evaluated = fx.eval_in("(+ z 1)", &Environment::new());
    assert_eq!(evaluated.result, Err(errors::unresolved_symbol("z")));
    assert_eq!(evaluated.reads[0].target, None);

    // Binding the name later makes the cached failure stale.
    let id = fx.read("(+ z 1)");
    let env = fx.bind(&Environment::new(), "z", 1, 3);
    let entry = fx.cache.lookup(id).unwrap();
    assert!(!entry.is_valid_in(&env, Instant::now()));
    assert!(entry.is_valid_in(&Environment::new(), Instant::now()));
}

#[test]
fn test_if_consults_only_chosen_branch() {
    let fx = Fixture::new();
    let id = fx.read("(if true 1 (oops))");
    let result = fx.evaluator().evaluate(id, &Environment::new()).unwrap().result;

    assert_eq!(result, Ok(Value::Int(1)));
    let consulted: Vec<NodeId> = fx.graph.dependencies_of(id).into_iter().map(|(n, _)| n).collect();
    assert_eq!(consulted, vec![fx.read("true"), fx.read("1")]);
    assert!(!fx.cache.contains(fx.read("(oops)")));
}

#[test]
fn test_if_requires_bool() {
    let fx = Fixture::new();
    assert_eq!(
        fx.eval("(if 1 2 3)"),
        Err(errors::type_mismatch("if", "a bool", &Value::Int(1)))
    );
}

#[test]
fn test_recover_handles_child_error() {
    let fx = Fixture::new();
    assert_eq!(fx.eval("(recover (/ 1 0) 7)"), Ok(Value::Int(7)));
    assert_eq!(fx.eval("(recover 3 7)"), Ok(Value::Int(3)));
}

#[test]
fn test_first_error_short_circuits() {
    let fx = Fixture::new();
    assert_eq!(
        fx.eval("(+ 1 (/ 1 0) (str.upper 1))"),
        Err(errors::division_by_zero())
    );
    assert!(!fx.cache.contains(fx.read("(str.upper 1)")));
}

#[test]
fn test_and_short_circuits() {
    let fx = Fixture::new();
    assert_eq!(fx.eval("(and false (/ 1 0))"), Ok(Value::Bool(false)));
    assert_eq!(fx.eval("(or true (/ 1 0))"), Ok(Value::Bool(true)));
}

#[test]
fn test_second_evaluation_hits() {
    let fx = Fixture::new();
    let id = fx.read("(* (+ 1 2) 3)");
    let mut evaluator = fx.evaluator();
    let first = evaluator.evaluate(id, &Environment::new()).unwrap();
    let second = evaluator.evaluate(id, &Environment::new()).unwrap();

    assert_eq!(first, second);
    let stats = evaluator.finish();
    assert_eq!(stats.recomputations, 5);
    assert_eq!(stats.hits, 1);
    assert!(stats.reused.contains(&id));
}

#[test]
fn test_shared_subtree_computed_once() {
    let fx = Fixture::new();
    let mut evaluator = fx.evaluator();
    let id = fx.read("(+ (* 6 7) (* 6 7))");
    let result = evaluator.evaluate(id, &Environment::new()).unwrap().result;

    assert_eq!(result, Ok(Value::Int(84)));
    assert!(evaluator.stats().reused.contains(&fx.read("(* 6 7)")));
}

#[test]
fn test_rebinding_makes_reader_stale() {
    let fx = Fixture::new();
    let first = fx.bind(&Environment::new(), "x", 1, 1);
    let second = fx.bind(&Environment::new(), "x", 2, 2);

    assert_eq!(fx.eval_in("(+ x 10)", &first).result, Ok(Value::Int(11)));
    assert_eq!(fx.eval_in("(+ x 10)", &second).result, Ok(Value::Int(12)));
}

#[test]
fn test_equal_result_keeps_generation() {
    let fx = Fixture::new();
    let one = fx.bind(&Environment::new(), "x", 3, 1);
    let other = fx.bind(&Environment::new(), "x", -3, 2);

    let first = fx.eval_in("(* x x)", &one);
    let second = fx.eval_in("(* x x)", &other);
    assert_eq!(first.result, Ok(Value::Int(9)));
    assert_eq!(second.result, Ok(Value::Int(9)));
    assert_eq!(first.generation, second.generation);

    let third = fx.eval_in("(* x x)", &fx.bind(&Environment::new(), "x", 4, 3));
    assert_ne!(third.generation, first.generation);
}

#[test]
fn test_self_reference_is_a_cycle() {
    let fx = Fixture::new();
    let store = &fx.store;
    let output = garden_parse::parse("(def a (+ a 1))", store);
    let id = output.roots()[0];
    let result = fx.evaluator().evaluate(id, &Environment::new()).unwrap().result;

    assert_eq!(
        result,
        Err(EvalError::CyclicDependency {
            cycle: vec!["a".to_owned(), "a".to_owned()]
        })
    );
}

#[test]
fn test_def_inner_let_shadows_own_name() {
    let fx = Fixture::new();
    let output = garden_parse::parse("(def a (let a 5 (+ a 1)))", &fx.store);
    let id = output.roots()[0];
    let evaluated = fx.evaluator().evaluate(id, &Environment::new()).unwrap();
    assert_eq!(evaluated.result, Ok(Value::Int(6)));
    assert!(evaluated.reads.is_empty());
}

#[test]
fn test_missing_effect_handler() {
    let fx = Fixture::new();
    let evaluated = fx.eval_in("(nope! 1)", &Environment::new());
    assert_eq!(evaluated.result, Err(errors::no_effect_handler("nope")));
    assert_eq!(evaluated.expiry, Expiry::Always);
}

#[test]
fn test_effect_ttl_expires() {
    let mut fx = Fixture::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    fx.effects.register_fn(
        "clock",
        EffectPolicy::Ttl(Duration::from_secs(60)),
        move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Int(i64::try_from(n).unwrap_or(i64::MAX)))
        },
    );
    let id = fx.read("(+ (clock!) 1)");
    let now = Instant::now();

    let first = fx.evaluator().at(now).evaluate(id, &Environment::new()).unwrap();
    let again = fx.evaluator().at(now + Duration::from_secs(30)).evaluate(id, &Environment::new()).unwrap();
    assert_eq!(first.result, again.result);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let later = fx.evaluator().at(now + Duration::from_secs(61)).evaluate(id, &Environment::new()).unwrap();
    assert_eq!(later.result, Ok(Value::Int(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_effect_failure_is_cached() {
    let mut fx = Fixture::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    fx.effects.register_fn("fail", EffectPolicy::Manual, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err("boom".to_owned())
    });

    assert_eq!(fx.eval("(fail!)"), Err(errors::effect_failed("fail", "boom")));
    assert_eq!(fx.eval("(fail!)"), Err(errors::effect_failed("fail", "boom")));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_effect_receives_evaluated_args() {
    let mut fx = Fixture::new();
    fx.effects.register_fn("echo", EffectPolicy::Always, |request| {
        Ok(Value::list(request.args.clone()))
    });
    assert_eq!(
        fx.eval(r#"(echo! (+ 1 1) "x")"#),
        Ok(Value::list(vec![Value::Int(2), Value::text("x")]))
    );
}

#[test]
fn test_cancelled_before_start() {
    let fx = Fixture::new();
    let id = fx.read("(+ 1 2)");
    fx.cancel.cancel();
    let outcome = fx.evaluator().evaluate(id, &Environment::new());
    assert!(matches!(outcome, Err(Interrupt::Cancelled)));
    assert!(fx.cache.is_empty());
}

#[test]
fn test_missing_node_is_engine_error() {
    let fx = Fixture::new();
    let missing = NodeId::from_bytes([9; 32]);
    let outcome = fx.evaluator().evaluate(missing, &Environment::new());
    assert!(matches!(
        outcome,
        Err(Interrupt::Engine(EngineError::Store(StoreError::NotFound(id)))) if id == missing
    ));
}

#[test]
fn test_deep_nesting() {
    let fx = Fixture::new();
    let depth = 20_000;
    let source = format!("{}0{}", "(+ 1 ".repeat(depth), ")".repeat(depth));
    assert_eq!(
        fx.eval(&source),
        Ok(Value::Int(i64::try_from(depth).unwrap()))
    );
}
