//! The tactic combinators.

use super::{Goal, Skip, Tactic, TacticError, TacticResult};
use crate::{
    ast::PrimitivePool,
    rewriter::{CancellationToken, RewriterError},
    HarrierOptions,
};
use std::sync::{mpsc, Mutex};
use std::time::Duration;

/// Applies `t1`, then applies `t2` to every resulting subgoal.
pub fn and_then(t1: Box<dyn Tactic>, t2: Box<dyn Tactic>) -> Box<dyn Tactic> {
    Box::new(AndThen(t1, t2))
}

/// Tries each tactic in order, returning the first success. Only recoverable failures are
/// caught; anything else is rethrown unchanged.
pub fn or_else(tactics: Vec<Box<dyn Tactic>>) -> Box<dyn Tactic> {
    assert!(!tactics.is_empty(), "or_else requires at least one tactic");
    Box::new(OrElse(tactics))
}

/// Runs all tactics in parallel on the same goal, each with a private pool clone. The first
/// successful worker wins: it cancels the others and its subgoals are translated back into the
/// caller's pool.
pub fn par(tactics: Vec<Box<dyn Tactic>>) -> Box<dyn Tactic> {
    assert!(!tactics.is_empty(), "par requires at least one tactic");
    Box::new(Par(tactics))
}

/// Applies `t1`, then applies `t2` to the resulting subgoals in parallel, one worker (and one
/// private pool clone) per subgoal.
pub fn par_and_then(t1: Box<dyn Tactic>, t2: Box<dyn Tactic>) -> Box<dyn Tactic> {
    Box::new(ParAndThen(t1, t2))
}

/// Applies the tactic repeatedly (at most `max` rounds) until it stops making progress.
/// Recoverable failures stop the iteration for the failing subgoal instead of propagating.
pub fn repeat(tactic: Box<dyn Tactic>, max: u32) -> Box<dyn Tactic> {
    Box::new(Repeat { tactic, max })
}

/// Runs the tactic on a worker thread and fails with a timeout if it does not finish in time.
/// The worker is cancelled cooperatively; it keeps its own pool clone, so the caller's pool is
/// never left in a partial state.
pub fn try_for(tactic: Box<dyn Tactic>, timeout: Duration) -> Box<dyn Tactic> {
    Box::new(TryFor { tactic, timeout })
}

/// Fails if the tactic produces more than one subgoal.
pub fn fail_if_branching(tactic: Box<dyn Tactic>) -> Box<dyn Tactic> {
    Box::new(FailIfBranching(tactic))
}

/// Fails on goals satisfying the predicate, and otherwise leaves them unchanged.
pub fn fail_if<P>(predicate: P) -> Box<dyn Tactic>
where
    P: Fn(&Goal) -> bool + Send + Sync + 'static,
{
    Box::new(FailIf(predicate))
}

/// Applies `then` to goals satisfying the predicate, and `otherwise` to the rest.
pub fn cond<P>(predicate: P, then: Box<dyn Tactic>, otherwise: Box<dyn Tactic>) -> Box<dyn Tactic>
where
    P: Fn(&Goal) -> bool + Send + Sync + 'static,
{
    Box::new(Cond { predicate, then, otherwise })
}

/// Applies the tactic only when proof production is disabled, and otherwise skips.
pub fn if_no_proofs(tactic: Box<dyn Tactic>) -> Box<dyn Tactic> {
    cond(|g: &Goal| !g.proofs_enabled, tactic, Box::new(Skip))
}

/// Applies the tactic only when unsat core production is disabled, and otherwise skips.
pub fn if_no_unsat_cores(tactic: Box<dyn Tactic>) -> Box<dyn Tactic> {
    cond(|g: &Goal| !g.unsat_core_enabled, tactic, Box::new(Skip))
}

/// Applies the tactic only when model production is disabled, and otherwise skips.
pub fn if_no_models(tactic: Box<dyn Tactic>) -> Box<dyn Tactic> {
    cond(|g: &Goal| !g.models_enabled, tactic, Box::new(Skip))
}

/// Reconfigures a tactic (and, through `updt_options`, its whole subtree).
pub fn using_params(mut tactic: Box<dyn Tactic>, options: &HarrierOptions) -> Box<dyn Tactic> {
    tactic.updt_options(options);
    tactic
}

/// `t` or, if it fails recoverably, the unchanged goal.
pub fn skip_if_failed(tactic: Box<dyn Tactic>) -> Box<dyn Tactic> {
    or_else(vec![tactic, Box::new(Skip)])
}

/// Applies the tactic and drops the subgoals it has already decided satisfiable. If every
/// subgoal was decided, a single trivially true goal remains.
pub fn cleanup(tactic: Box<dyn Tactic>) -> Box<dyn Tactic> {
    Box::new(Cleanup(tactic))
}

/// Gives a tactic a different name, for reporting purposes.
pub fn annotate(name: &'static str, tactic: Box<dyn Tactic>) -> Box<dyn Tactic> {
    Box::new(Annotate { name, tactic })
}

struct AndThen(Box<dyn Tactic>, Box<dyn Tactic>);

impl Tactic for AndThen {
    fn name(&self) -> &'static str {
        "and-then"
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        let goals = self.0.apply(pool, goal, cancel)?;
        let mut result = Vec::new();
        for g in &goals {
            result.extend(self.1.apply(pool, g, cancel)?);
        }
        Ok(result)
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        self.0.updt_options(options);
        self.1.updt_options(options);
    }
}

struct OrElse(Vec<Box<dyn Tactic>>);

impl Tactic for OrElse {
    fn name(&self) -> &'static str {
        "or-else"
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        let mut last_error = None;
        for tactic in &self.0 {
            match tactic.apply(pool, goal, cancel) {
                Ok(goals) => return Ok(goals),
                Err(e) if e.is_recoverable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or(TacticError::NotApplicable("or-else")))
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        for t in &mut self.0 {
            t.updt_options(options);
        }
    }
}

struct Par(Vec<Box<dyn Tactic>>);

impl Tactic for Par {
    fn name(&self) -> &'static str {
        "par"
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        if cancel.is_cancelled() {
            return Err(RewriterError::Cancelled.into());
        }
        let winner: Mutex<Option<Vec<Goal>>> = Mutex::new(None);
        let errors: Mutex<Vec<TacticError>> = Mutex::new(Vec::new());
        let tokens: Vec<CancellationToken> =
            self.0.iter().map(|_| CancellationToken::new()).collect();

        std::thread::scope(|s| {
            for (i, tactic) in self.0.iter().enumerate() {
                let mut worker_pool = pool.clone();
                let token = tokens[i].clone();
                let (winner, errors, tokens) = (&winner, &errors, &tokens);
                s.spawn(move || {
                    match tactic.apply(&mut worker_pool, goal, &token) {
                        Ok(goals) => {
                            let mut w = winner.lock().expect("no panics while holding the lock");
                            if w.is_none() {
                                *w = Some(goals);
                                // The first worker to finish successfully cancels the rest
                                for (j, other) in tokens.iter().enumerate() {
                                    if j != i {
                                        other.cancel();
                                    }
                                }
                            }
                        }
                        Err(e) => errors
                            .lock()
                            .expect("no panics while holding the lock")
                            .push(e),
                    }
                });
            }
        });

        match winner.into_inner().expect("no panics while holding the lock") {
            Some(goals) => Ok(goals.iter().map(|g| g.translate_into(pool)).collect()),
            None => {
                let mut errors = errors.into_inner().expect("no panics while holding the lock");
                match errors.iter().position(|e| !e.is_recoverable()) {
                    Some(i) => Err(errors.swap_remove(i)),
                    None => Err(errors.pop().unwrap_or(TacticError::NotApplicable("par"))),
                }
            }
        }
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        for t in &mut self.0 {
            t.updt_options(options);
        }
    }
}

struct ParAndThen(Box<dyn Tactic>, Box<dyn Tactic>);

impl Tactic for ParAndThen {
    fn name(&self) -> &'static str {
        "par-and-then"
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        let goals = self.0.apply(pool, goal, cancel)?;
        let slots: Vec<Mutex<Option<TacticResult>>> =
            goals.iter().map(|_| Mutex::new(None)).collect();

        std::thread::scope(|s| {
            for (goal, slot) in goals.iter().zip(&slots) {
                let mut worker_pool = pool.clone();
                let tactic = &self.1;
                let token = cancel.clone();
                s.spawn(move || {
                    let result = tactic.apply(&mut worker_pool, goal, &token);
                    *slot.lock().expect("no panics while holding the lock") = Some(result);
                });
            }
        });

        let mut result = Vec::new();
        for slot in slots {
            let subgoals = slot
                .into_inner()
                .expect("no panics while holding the lock")
                .expect("worker finished")?;
            result.extend(subgoals.iter().map(|g| g.translate_into(pool)));
        }
        Ok(result)
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        self.0.updt_options(options);
        self.1.updt_options(options);
    }
}

struct Repeat {
    tactic: Box<dyn Tactic>,
    max: u32,
}

impl Tactic for Repeat {
    fn name(&self) -> &'static str {
        "repeat"
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        let mut goals = vec![goal.clone()];
        for _ in 0..self.max {
            let mut next = Vec::new();
            let mut progress = false;
            for g in &goals {
                match self.tactic.apply(pool, g, cancel) {
                    Ok(subgoals) => {
                        if subgoals.len() != 1 || subgoals[0] != *g {
                            progress = true;
                        }
                        next.extend(subgoals);
                    }
                    Err(e) if e.is_recoverable() => next.push(g.clone()),
                    Err(e) => return Err(e),
                }
            }
            goals = next;
            if !progress {
                break;
            }
        }
        Ok(goals)
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        self.tactic.updt_options(options);
    }
}

struct TryFor {
    tactic: Box<dyn Tactic>,
    timeout: Duration,
}

impl Tactic for TryFor {
    fn name(&self) -> &'static str {
        "try-for"
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        if cancel.is_cancelled() {
            return Err(RewriterError::Cancelled.into());
        }
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel();

        let received = std::thread::scope(|s| {
            let mut worker_pool = pool.clone();
            let tactic = &self.tactic;
            let worker_token = token.clone();
            s.spawn(move || {
                let result = tactic.apply(&mut worker_pool, goal, &worker_token);
                // The receiver may have given up already
                let _ = tx.send(result);
            });
            match rx.recv_timeout(self.timeout) {
                Ok(result) => Some(result),
                Err(_) => {
                    // Cancellation is cooperative: the worker notices the token between rewrite
                    // steps, and the scope waits for it before returning
                    token.cancel();
                    None
                }
            }
        });

        match received {
            Some(result) => {
                let goals = result?;
                Ok(goals.iter().map(|g| g.translate_into(pool)).collect())
            }
            None => Err(TacticError::Timeout(self.tactic.name())),
        }
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        self.tactic.updt_options(options);
    }
}

struct FailIfBranching(Box<dyn Tactic>);

impl Tactic for FailIfBranching {
    fn name(&self) -> &'static str {
        "fail-if-branching"
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        let goals = self.0.apply(pool, goal, cancel)?;
        if goals.len() > 1 {
            return Err(TacticError::Branching(self.0.name(), goals.len()));
        }
        Ok(goals)
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        self.0.updt_options(options);
    }
}

struct Cleanup(Box<dyn Tactic>);

impl Tactic for Cleanup {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        let mut goals = self.0.apply(pool, goal, cancel)?;
        let decided: Vec<Goal> = goals.iter().filter(|g| g.is_decided_sat()).cloned().collect();
        goals.retain(|g| !g.is_decided_sat());
        if goals.is_empty() {
            // Keep one representative so the caller still sees a decided result
            goals.extend(decided.into_iter().take(1));
        }
        Ok(goals)
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        self.0.updt_options(options);
    }
}

struct Annotate {
    name: &'static str,
    tactic: Box<dyn Tactic>,
}

impl Tactic for Annotate {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        self.tactic.apply(pool, goal, cancel)
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        self.tactic.updt_options(options);
    }
}

struct FailIf<P>(P);

impl<P> Tactic for FailIf<P>
where
    P: Fn(&Goal) -> bool + Send + Sync,
{
    fn name(&self) -> &'static str {
        "fail-if"
    }

    fn apply(&self, _: &mut PrimitivePool, goal: &Goal, _: &CancellationToken) -> TacticResult {
        if (self.0)(goal) {
            Err(TacticError::NotApplicable(self.name()))
        } else {
            Ok(vec![goal.clone()])
        }
    }
}

struct Cond<P> {
    predicate: P,
    then: Box<dyn Tactic>,
    otherwise: Box<dyn Tactic>,
}

impl<P> Tactic for Cond<P>
where
    P: Fn(&Goal) -> bool + Send + Sync,
{
    fn name(&self) -> &'static str {
        "cond"
    }

    fn apply(
        &self,
        pool: &mut PrimitivePool,
        goal: &Goal,
        cancel: &CancellationToken,
    ) -> TacticResult {
        if (self.predicate)(goal) {
            self.then.apply(pool, goal, cancel)
        } else {
            self.otherwise.apply(pool, goal, cancel)
        }
    }

    fn updt_options(&mut self, options: &HarrierOptions) {
        self.then.updt_options(options);
        self.otherwise.updt_options(options);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::pool::PrimitivePool;
    use crate::parser::tests::parse_terms;
    use crate::tactic::{Fail, SimplifyTactic, Tactic};
    use crate::HarrierOptions;

    fn simplify() -> Box<dyn Tactic> {
        let options = HarrierOptions {
            sort_sums: true,
            ..Default::default()
        };
        Box::new(SimplifyTactic::new(options))
    }

    fn goal_with(pool: &mut PrimitivePool, definitions: &str, assertions: &[&str]) -> Goal {
        let mut goal = Goal::new(false, false, false);
        for &a in assertions {
            let [term] = parse_terms(pool, definitions, [a]);
            goal.assert(term);
        }
        goal
    }

    const DEFINITIONS: &str = "
        (declare-const x Int)
        (declare-const y Int)
    ";

    #[test]
    fn test_simplify_tactic() {
        let mut pool = PrimitivePool::new();
        let goal = goal_with(&mut pool, DEFINITIONS, &["(<= (+ x 1 y) (+ y 2))"]);
        let token = CancellationToken::new();
        let result = simplify().apply(&mut pool, &goal, &token).unwrap();
        assert_eq!(result.len(), 1);
        let [expected] = parse_terms(&mut pool, DEFINITIONS, ["(<= x 1)"]);
        assert_eq!(result[0].assertions(), [expected].as_slice());
    }

    #[test]
    fn test_gcd_test_closes_goal() {
        let mut pool = PrimitivePool::new();
        // 2x + 4y = 1 has no integer solution
        let goal = goal_with(&mut pool, DEFINITIONS, &["(= (+ (* 2 x) (* 4 y)) 1)"]);
        let token = CancellationToken::new();
        let result = simplify().apply(&mut pool, &goal, &token).unwrap();
        assert!(result[0].is_decided_unsat());
    }

    #[test]
    fn test_or_else_and_skip_if_failed() {
        let mut pool = PrimitivePool::new();
        let goal = goal_with(&mut pool, DEFINITIONS, &["(< x y)"]);
        let token = CancellationToken::new();

        let tactic = or_else(vec![Box::new(Fail), simplify()]);
        assert!(tactic.apply(&mut pool, &goal, &token).is_ok());

        let tactic = skip_if_failed(Box::new(Fail));
        let result = tactic.apply(&mut pool, &goal, &token).unwrap();
        assert_eq!(result, vec![goal]);
    }

    #[test]
    fn test_repeat_reaches_fixed_point() {
        let mut pool = PrimitivePool::new();
        let goal = goal_with(&mut pool, DEFINITIONS, &["(= (+ x x 1) (+ x 1))"]);
        let token = CancellationToken::new();
        let tactic = repeat(simplify(), 8);
        let first = tactic.apply(&mut pool, &goal, &token).unwrap();
        let second = tactic.apply(&mut pool, &first[0], &token).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_par_prefers_any_winner() {
        let mut pool = PrimitivePool::new();
        let goal = goal_with(&mut pool, DEFINITIONS, &["(<= (+ x 1 y) (+ y 2))"]);
        let token = CancellationToken::new();
        let tactic = par(vec![simplify(), simplify(), Box::new(Fail)]);
        let result = tactic.apply(&mut pool, &goal, &token).unwrap();
        assert_eq!(result.len(), 1);
        // The winner's terms are translated back, so they are pointer equal to terms built
        // directly in the caller's pool
        let [expected] = parse_terms(&mut pool, DEFINITIONS, ["(<= x 1)"]);
        assert_eq!(result[0].assertions(), [expected].as_slice());
    }

    #[test]
    fn test_feature_guards() {
        let mut pool = PrimitivePool::new();
        let mut goal = goal_with(&mut pool, DEFINITIONS, &["(< (+ x 0) y)"]);
        goal.proofs_enabled = true;
        let token = CancellationToken::new();

        // With proofs enabled, the guard skips the simplification
        let tactic = if_no_proofs(simplify());
        let result = tactic.apply(&mut pool, &goal, &token).unwrap();
        assert_eq!(result, vec![goal.clone()]);

        goal.proofs_enabled = false;
        let result = tactic.apply(&mut pool, &goal, &token).unwrap();
        assert_ne!(result, vec![goal]);
    }

    #[test]
    fn test_cleanup_drops_decided_goals() {
        let mut pool = PrimitivePool::new();
        // x + 0 = x simplifies to true, deciding the goal
        let goal = goal_with(&mut pool, DEFINITIONS, &["(= (+ x 0) x)"]);
        let token = CancellationToken::new();
        let tactic = cleanup(annotate("solve", simplify()));
        assert_eq!(tactic.name(), "cleanup");
        let result = tactic.apply(&mut pool, &goal, &token).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result[0].is_decided_sat());
    }

    #[test]
    fn test_fail_if_branching_accepts_single_goal() {
        let mut pool = PrimitivePool::new();
        let goal = goal_with(&mut pool, DEFINITIONS, &["(< x y)"]);
        let token = CancellationToken::new();
        let tactic = fail_if_branching(simplify());
        assert!(tactic.apply(&mut pool, &goal, &token).is_ok());
    }

    #[test]
    fn test_try_for_finishes_fast_tactics() {
        let mut pool = PrimitivePool::new();
        let goal = goal_with(&mut pool, DEFINITIONS, &["(<= (+ x 1 y) (+ y 2))"]);
        let token = CancellationToken::new();
        let tactic = try_for(simplify(), Duration::from_secs(10));
        let result = tactic.apply(&mut pool, &goal, &token).unwrap();
        let [expected] = parse_terms(&mut pool, DEFINITIONS, ["(<= x 1)"]);
        assert_eq!(result[0].assertions(), [expected].as_slice());
    }
}
