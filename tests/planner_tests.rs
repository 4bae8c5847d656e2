//! Query planner integration tests

use std::thread;

use nlplan::planner::{Part, Simplifier};
use nlplan::{NlPlanner, Plan, PlanError, PlanText, PlannerConfig};

fn steps(sql: &str) -> Vec<String> {
    steps_with(PlannerConfig::default(), sql)
}

fn steps_with(config: PlannerConfig, sql: &str) -> Vec<String> {
    NlPlanner::new(config).plan(sql).unwrap().steps(0).unwrap()
}

/// Step numbers referenced by a rendered line
fn referenced_steps(line: &str) -> Vec<usize> {
    line.split("results of Step ")
        .skip(1)
        .filter_map(|rest| {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        })
        .collect()
}

/// Every reference points strictly backwards
fn assert_no_forward_refs(lines: &[String]) {
    for (idx, line) in lines.iter().enumerate() {
        let own = idx + 1;
        assert!(line.starts_with(&format!("{}. ", own)), "bad numbering: {}", line);
        assert!(line.ends_with('.'), "missing period: {}", line);
        assert!(!line.ends_with(".."), "duplicated period: {}", line);
        for target in referenced_steps(line) {
            assert!(target < own, "forward reference in {}", line);
        }
    }
}

const QUERIES: &[&str] = &[
    "SELECT name FROM Person WHERE age > 30",
    "SELECT COUNT(*) FROM Orders",
    "SELECT a.x FROM T1 AS a JOIN T2 AS b ON a.id = b.id",
    "SELECT * FROM A JOIN B ON A.id = B.id WHERE A.x = 1 AND B.y = 2",
    "SELECT DISTINCT city FROM people WHERE NOT (age < 18 OR name LIKE 'a%') ORDER BY city DESC",
    "SELECT dept, AVG(salary) FROM emp GROUP BY dept HAVING AVG(salary) > 1000 LIMIT 3",
    "SELECT a FROM t UNION SELECT a FROM u EXCEPT SELECT a FROM v",
    "SELECT name FROM s WHERE id IN (SELECT sid FROM e WHERE grade = 'A') AND age BETWEEN 18 AND 25",
    "SELECT c.name, COUNT(*) FROM c, o WHERE c.id = o.cid AND o.total > 100 GROUP BY c.name",
    "SELECT x FROM (SELECT x FROM t WHERE x IS NOT NULL) AS d WHERE x <> 0",
    "SELECT a = 1 AS flag, b BETWEEN 1 AND 2, c FROM t WHERE c > .5",
    "SELECT DISTINCT a.x, a.y > b.y FROM a JOIN b ON a.id = b.id WHERE a.k = 1",
];

// ============ Scenario Tests ============

#[test]
fn test_single_table_filter() {
    assert_eq!(
        steps("SELECT name FROM Person WHERE age > 30"),
        vec![
            "1. Load data for table Person.",
            "2. Filter results of Step 1 using condition: age is greater than 30.",
            "3. Create table with columns name from results of Step 2.",
            "4. Write to 'result.csv' the results of Step 3.",
        ]
    );
}

#[test]
fn test_count_star() {
    let lines = steps("SELECT COUNT(*) FROM Orders");
    assert_eq!(
        lines,
        vec![
            "1. Load data for table Orders.",
            "2. Create table with columns number of rows from results of Step 1.",
            "3. Write to 'result.csv' the results of Step 2.",
        ]
    );
}

#[test]
fn test_join_scenario() {
    assert_eq!(
        steps("SELECT a.x FROM T1 AS a JOIN T2 AS b ON a.id = b.id"),
        vec![
            "1. Load table T1 and store as alias a.",
            "2. Load table T2 and store as alias b.",
            "3. Join results of Step 1 with results of Step 2 - condition: id in a equals id in b.",
            "4. Retrieve x in a from results of Step 3.",
            "5. Create table with columns for results of Step 4.",
            "6. Write to 'result.csv' the results of Step 5.",
        ]
    );
}

#[test]
fn test_join_filters_precede_join_in_table_order() {
    let lines = steps("SELECT * FROM A JOIN B ON A.id = B.id WHERE A.x = 1 AND B.y = 2");
    assert_eq!(
        lines[..5],
        [
            "1. Load table A and store as alias A.",
            "2. Load table B and store as alias B.",
            "3. Filter results of Step 1: x in A equals 1.",
            "4. Filter results of Step 2: y in B equals 2.",
            "5. Join results of Step 3 with results of Step 4 - condition: id in A equals id in B.",
        ]
    );
}

#[test]
fn test_conjunct_count_matches_filter_count() {
    let lines = steps(
        "SELECT * FROM A JOIN B ON A.id = B.id \
         WHERE A.x = 1 AND B.y = 2 AND A.z < 3 AND (B.w = 4 OR B.w = 5)",
    );
    let join_pos = lines
        .iter()
        .position(|l| l.contains(". Join "))
        .unwrap();
    let filters = lines[..join_pos]
        .iter()
        .filter(|l| l.contains(" Filter "))
        .count();
    assert_eq!(filters, 4);
}

#[test]
fn test_cross_table_predicate_after_join() {
    let lines = steps("SELECT c.name FROM c, o WHERE c.id = o.cid AND o.total > 100");
    assert_eq!(lines[2], "3. Filter results of Step 2: total in o is greater than 100.");
    assert_eq!(
        lines[3],
        "4. Join results of Step 1 with results of Step 3 - condition: none (all combinations of rows)."
    );
    assert_eq!(lines[4], "5. Filter results of Step 4: id in c equals cid in o.");
}

#[test]
fn test_set_operation_then_limit() {
    let lines = steps("SELECT a FROM t UNION SELECT a FROM u LIMIT 2");
    assert_eq!(
        lines[4],
        "5. Combine rows from results of Step 2 and results of Step 4 (remove duplicates)."
    );
    assert_eq!(lines[5], "6. Keep only 2 rows from results of Step 5.");
    assert_eq!(lines[6], "7. Write to 'result.csv' the results of Step 6.");
}

#[test]
fn test_in_subquery() {
    let lines = steps("SELECT name FROM s WHERE id IN (SELECT sid FROM e)");
    assert_eq!(lines[0], "1. Load data for table s.");
    assert_eq!(lines[1], "2. Load data for table e.");
    assert_eq!(lines[2], "3. Create table with columns sid from results of Step 2.");
    assert_eq!(
        lines[3],
        "4. Filter results of Step 1 using condition: id appears in results of Step 3."
    );
}

#[test]
fn test_leading_dot_number() {
    assert_eq!(
        steps("SELECT a FROM t WHERE a > .5")[1],
        "2. Filter results of Step 1 using condition: a is greater than .5."
    );
}

#[test]
fn test_boolean_columns_stay_separate() {
    assert_eq!(
        steps("SELECT a = 1, b = 2 FROM t")[1],
        "2. Create table with columns (a equals 1) and (b equals 2) from results of Step 1."
    );
    assert_eq!(
        steps("SELECT a = 1 AND b = 2 FROM t")[1],
        "2. Create table with columns a equals 1 and b equals 2 from results of Step 1."
    );
}

#[test]
fn test_retrieve_inlines_check() {
    let lines = steps("SELECT a.x > 1 FROM a JOIN b ON a.id = b.id");
    assert_eq!(lines[3], "4. Retrieve x in a is greater than 1 from results of Step 3.");
    assert_eq!(lines[4], "5. Create table with columns for results of Step 4.");
}

#[test]
fn test_join_distinct() {
    assert_eq!(
        steps("SELECT DISTINCT a.x FROM a JOIN b ON a.id = b.id"),
        vec![
            "1. Load table a and store as alias a.",
            "2. Load table b and store as alias b.",
            "3. Join results of Step 1 with results of Step 2 - condition: id in a equals id in b.",
            "4. Retrieve x in a from results of Step 3.",
            "5. Create table with columns for results of Step 4.",
            "6. Only keep unique rows from results of Step 5.",
            "7. Write to 'result.csv' the results of Step 6.",
        ]
    );
}

// ============ Property Tests ============

#[test]
fn test_plans_end_with_write_of_earlier_step() {
    for sql in QUERIES {
        let lines = steps(sql);
        assert!(!lines.is_empty());
        let last = lines.last().unwrap();
        let own = lines.len();
        assert!(last.starts_with(&format!("{}. Write", own)), "{}", last);
        let refs = referenced_steps(last);
        assert_eq!(refs.len(), 1);
        assert!(refs[0] < own);
    }
}

#[test]
fn test_no_forward_references() {
    for sql in QUERIES {
        assert_no_forward_refs(&steps(sql));
        assert_no_forward_refs(&steps_with(PlannerConfig::default().with_simplify(false), sql));
    }
}

#[test]
fn test_simplification_is_idempotent() {
    let planner = NlPlanner::new(PlannerConfig::default());
    let simplifier = Simplifier::new();
    for sql in QUERIES {
        let mut plan = planner.plan(sql).unwrap();
        let once = plan.steps(0).unwrap();
        simplifier.simplify(&mut plan);
        assert_eq!(plan.steps(0).unwrap(), once, "{}", sql);
    }
}

#[test]
fn test_simplification_only_removes_steps() {
    for sql in QUERIES {
        let full = steps_with(PlannerConfig::default().with_simplify(false), sql);
        let short = steps(sql);
        assert!(short.len() <= full.len());
        assert_no_forward_refs(&short);
    }
}

#[test]
fn test_intersperse_doubles_and_alternates() {
    for sql in QUERIES {
        let plain = steps(sql);
        let config = PlannerConfig::default().with_intersperse("Print progress");
        let mixed = steps_with(config, sql);
        assert_eq!(mixed.len(), plain.len() * 2);
        for (idx, line) in mixed.iter().enumerate() {
            let injected = line.ends_with("Print progress.");
            assert_eq!(injected, idx % 2 == 1, "{}", line);
        }
        assert_no_forward_refs(&mixed);
    }
}

#[test]
fn test_offset_shifts_numbers_and_references() {
    let plan = NlPlanner::new(PlannerConfig::default())
        .plan("SELECT a FROM t")
        .unwrap();
    assert_eq!(
        plan.steps(10).unwrap(),
        vec![
            "11. Load data for table t.",
            "12. Create table with columns a from results of Step 11.",
            "13. Write to 'result.csv' the results of Step 12.",
        ]
    );
    assert_eq!(
        PlanText::format(&plan, "#", 0).unwrap().lines().next(),
        Some("# 1. Load data for table t.")
    );
}

#[test]
fn test_parallel_sessions_match_sequential() {
    let sequential: Vec<Vec<String>> = QUERIES.iter().map(|sql| steps(sql)).collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                let planner = NlPlanner::new(PlannerConfig::default());
                QUERIES
                    .iter()
                    .map(|sql| planner.plan(sql).unwrap().steps(0).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), sequential);
    }
}

#[test]
fn test_case_folding_and_quoting() {
    let config = PlannerConfig::default()
        .with_case_sensitive(false)
        .with_quote_identifiers(true);
    assert_eq!(
        steps_with(config, "SELECT Name FROM Person WHERE City = 'Paris'")[1],
        "2. Filter results of Step 1 using condition: 'city' equals 'Paris'."
    );
}

// ============ Error Tests ============

#[test]
fn test_errors_are_atomic() {
    let planner = NlPlanner::new(PlannerConfig::default());
    assert!(matches!(planner.plan("SELECT a FROM"), Err(PlanError::Parse(_))));
    assert_eq!(
        planner.plan("SELECT CAST(a AS INT) FROM t").unwrap_err(),
        PlanError::unsupported("Cast")
    );
    assert!(matches!(
        planner.plan("SELECT * FROM a JOIN b ON a.id > b.id"),
        Err(PlanError::MalformedJoinCondition(_))
    ));
    assert!(matches!(
        planner.plan("INSERT INTO t VALUES (1)"),
        Err(PlanError::UnsupportedConstruct { .. })
    ));
}

#[test]
fn test_foreign_reference_is_unresolved() {
    let mut source = Plan::session();
    let foreign = source.add_step(vec![Part::text("Load data for table t")]);

    let mut plan = Plan::session();
    plan.add_step(vec![Part::text("Only keep unique rows from"), Part::Ref(foreign)]);
    assert_eq!(
        plan.validate(),
        Err(PlanError::UnresolvedReference { step: foreign })
    );
}
