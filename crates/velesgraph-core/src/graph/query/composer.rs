//! Parameterized traversal query composition.
//!
//! Every user-supplied value (example attributes and values, ids, graph
//! name, weights, ignored attributes, collection restrictions used as
//! values) travels as a bind variable. The only identifiers interpolated
//! into query text are collection names, which are validated and
//! backtick-quoted first.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use super::example::Example;
use super::options::{
    CommonPropertiesOptions, Direction, EdgeWeight, PathOptions, PathsOptions, TraversalOptions,
};
use crate::config::QueryConfig;
use crate::error::{Error, Result};
use crate::store::DocumentHandle;

/// Query text plus its bind variables, ready for a query engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedQuery {
    /// Query text.
    pub query: String,
    /// Bind variables referenced as `@name` in the text.
    pub bind_vars: IndexMap<String, Value>,
}

/// Returns true if `name` may be interpolated as a collection identifier.
#[must_use]
pub fn is_valid_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    }
}

fn quote(name: &str) -> String {
    format!("`{name}`")
}

#[derive(Debug, Default)]
struct BindVars(IndexMap<String, Value>);

impl BindVars {
    fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }
}

/// Composes queries over one graph's collections.
#[derive(Debug, Clone)]
pub struct QueryComposer<'a> {
    graph_name: &'a str,
    vertex_collections: Vec<&'a str>,
    edge_collections: Vec<&'a str>,
    limits: &'a QueryConfig,
}

impl<'a> QueryComposer<'a> {
    /// Creates a composer for `graph_name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::GraphEmpty` if there is no vertex collection and
    /// `Error::InvalidParameter` if a collection name is not a valid
    /// identifier.
    pub fn new(
        graph_name: &'a str,
        vertex_collections: Vec<&'a str>,
        edge_collections: Vec<&'a str>,
        limits: &'a QueryConfig,
    ) -> Result<Self> {
        if vertex_collections.is_empty() {
            return Err(Error::GraphEmpty(graph_name.to_string()));
        }
        if let Some(bad) = vertex_collections
            .iter()
            .chain(&edge_collections)
            .find(|c| !is_valid_collection_name(c))
        {
            return Err(Error::InvalidParameter(format!(
                "illegal collection name '{bad}'"
            )));
        }
        Ok(Self {
            graph_name,
            vertex_collections,
            edge_collections,
            limits,
        })
    }

    // ---------------------------------------------------------------------
    // Building blocks
    // ---------------------------------------------------------------------

    fn graph_ref(&self, vars: &mut BindVars) -> &'static str {
        vars.bind("graphName", self.graph_name);
        "GRAPH @graphName"
    }

    /// `coll` or `UNION((FOR x IN a RETURN x), ...)`.
    fn all_of(collections: &[&str]) -> String {
        if let [single] = collections {
            return quote(single);
        }
        let branches: Vec<String> = collections
            .iter()
            .map(|c| format!("(FOR x IN {} RETURN x)", quote(c)))
            .collect();
        format!("UNION({})", branches.join(", "))
    }

    /// `FILTER (...) OR (...)`, or nothing for match-all examples.
    fn example_filter(example: &Example, vars: &mut BindVars, var: &str) -> Result<String> {
        if example.is_match_all() {
            return Ok(String::new());
        }

        let mut count = 0usize;
        let mut alternatives = Vec::new();
        for alternative in example.alternatives() {
            match alternative {
                Example::Id(id) => {
                    DocumentHandle::parse(id)?;
                    vars.bind(format!("{var}ExVar{count}"), id.as_str());
                    alternatives.push(format!("{var}._id == @{var}ExVar{count}"));
                    count += 1;
                }
                Example::Attributes(attributes) => {
                    let mut terms = Vec::with_capacity(attributes.len());
                    for (attribute, value) in attributes {
                        vars.bind(format!("{var}ExVar{count}"), attribute.as_str());
                        vars.bind(format!("{var}ExVal{count}"), value.clone());
                        terms.push(format!("{var}[@{var}ExVar{count}] == @{var}ExVal{count}"));
                        count += 1;
                    }
                    alternatives.push(terms.join(" AND "));
                }
                Example::All | Example::AnyOf(_) => {}
            }
        }
        Ok(format!("FILTER ({})", alternatives.join(") OR (")))
    }

    /// `FOR var IN ...` over `collections`, filtered by `example`.
    fn for_example(
        example: &Example,
        collections: &[&str],
        vars: &mut BindVars,
        var: &str,
    ) -> Result<String> {
        let filter = Self::example_filter(example, vars, var)?;
        if filter.is_empty() {
            return Ok(format!("FOR {var} IN {}", Self::all_of(collections)));
        }
        if let [single] = collections {
            return Ok(format!("FOR {var} IN {} {filter}", quote(single)));
        }
        let branches: Vec<String> = collections
            .iter()
            .map(|c| format!("(FOR {var} IN {} {filter} RETURN {var})", quote(c)))
            .collect();
        Ok(format!("FOR {var} IN UNION({})", branches.join(", ")))
    }

    fn edge_restriction(&self, restriction: &[String], vars: &mut BindVars) -> Result<String> {
        if restriction.is_empty() {
            return Ok(self.graph_ref(vars).to_string());
        }
        let mut quoted = Vec::with_capacity(restriction.len());
        for name in restriction {
            if !self.edge_collections.contains(&name.as_str()) {
                return Err(Error::EdgeCollectionDoesNotExist(name.clone()));
            }
            quoted.push(quote(name));
        }
        Ok(quoted.join(", "))
    }

    fn check_vertex_restriction(&self, restriction: &[String]) -> Result<()> {
        match restriction
            .iter()
            .find(|name| !self.vertex_collections.contains(&name.as_str()))
        {
            Some(name) => Err(Error::VertexCollectionDoesNotExist(name.clone())),
            None => Ok(()),
        }
    }

    fn vertex_restriction(
        &self,
        restriction: &[String],
        vars: &mut BindVars,
        var: &str,
        prefix: &str,
    ) -> Result<String> {
        if restriction.is_empty() {
            return Ok(String::new());
        }
        self.check_vertex_restriction(restriction)?;
        let terms: Vec<String> = restriction
            .iter()
            .enumerate()
            .map(|(i, name)| {
                vars.bind(format!("{prefix}Collection{i}"), name.as_str());
                format!("IS_SAME_COLLECTION(@{prefix}Collection{i}, {var})")
            })
            .collect();
        Ok(format!("FILTER ({})", terms.join(" OR ")))
    }

    /// `WITH a, b` when traversing explicit edge collections.
    fn with_statement(&self, edge_restriction: &[String]) -> String {
        if edge_restriction.is_empty() {
            return String::new();
        }
        let quoted: Vec<String> = self.vertex_collections.iter().map(|c| quote(c)).collect();
        format!("WITH {}", quoted.join(", "))
    }

    fn depth(&self, min: Option<u32>, max: Option<u32>, defaults: (u32, u32)) -> Result<(u32, u32)> {
        let min = min.unwrap_or(defaults.0);
        let max = max.unwrap_or_else(|| defaults.1.max(min));
        if min > max {
            return Err(Error::InvalidParameter(format!(
                "minimum depth {min} exceeds maximum depth {max}"
            )));
        }
        if max > self.limits.max_depth_limit {
            return Err(Error::InvalidParameter(format!(
                "maximum depth {max} exceeds limit {}",
                self.limits.max_depth_limit
            )));
        }
        Ok((min, max))
    }

    fn weight_options(weight: Option<&EdgeWeight>, vars: &mut BindVars) -> String {
        match weight {
            Some(weight) => {
                vars.bind("attribute", weight.attribute.as_str());
                vars.bind("default", weight.default);
                "OPTIONS {weightAttribute: @attribute, defaultWeight: @default}".to_string()
            }
            None => String::new(),
        }
    }

    /// Body of `LET p = (FOR v, e IN <dir> SHORTEST_PATH ...)` returning
    /// one weight per traversed edge.
    fn weighted_path(
        &self,
        options: &PathOptions,
        from: &str,
        to: &str,
        vars: &mut BindVars,
    ) -> String {
        let graph = self.graph_ref(vars);
        let weight_options = Self::weight_options(options.weight.as_ref(), vars);
        let weight = if options.weight.is_some() {
            "IS_NUMBER(e[@attribute]) ? e[@attribute] : @default"
        } else {
            "1"
        };
        format!(
            "(FOR v, e IN {} SHORTEST_PATH {from} TO {to} {graph} {weight_options} FILTER e != null RETURN {weight})",
            options.direction.keyword()
        )
    }

    fn finish(shape: &'static str, lines: Vec<String>, vars: BindVars) -> ComposedQuery {
        let query = lines
            .iter()
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        trace!(
            shape,
            bind_vars = ?vars.0.keys().collect::<Vec<_>>(),
            "query composed"
        );
        ComposedQuery {
            query,
            bind_vars: vars.0,
        }
    }

    // ---------------------------------------------------------------------
    // Query shapes
    // ---------------------------------------------------------------------

    /// Edges reachable from vertices matching `example`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad`, `Error::EdgeCollectionDoesNotExist`
    /// or `Error::InvalidParameter` for invalid input.
    pub fn edges(&self, example: &Example, options: &TraversalOptions) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let (min, max) = self.depth(options.min_depth, options.max_depth, (1, 1))?;
        let lines = vec![
            self.with_statement(&options.edge_collection_restriction),
            Self::for_example(example, &self.vertex_collections, &mut vars, "start")?,
            format!(
                "FOR v, e IN {min}..{max} {} start {}",
                options.direction.keyword(),
                self.edge_restriction(&options.edge_collection_restriction, &mut vars)?
            ),
            Self::example_filter(&options.edge_examples, &mut vars, "e")?,
            format!(
                "RETURN DISTINCT {}",
                if options.include_data { "e" } else { "e._id" }
            ),
        ];
        Ok(Self::finish("edges", lines, vars))
    }

    /// Vertices matching `example`, optionally restricted by collection.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` or
    /// `Error::VertexCollectionDoesNotExist`.
    pub fn vertices(&self, example: &Example, options: &TraversalOptions) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let restriction = &options.vertex_collection_restriction;
        self.check_vertex_restriction(restriction)?;
        let collections: Vec<&str> = if restriction.is_empty() {
            self.vertex_collections.clone()
        } else {
            restriction.iter().map(String::as_str).collect()
        };
        let lines = vec![
            Self::for_example(&Example::All, &collections, &mut vars, "start")?,
            Self::example_filter(example, &mut vars, "start")?,
            "RETURN DISTINCT start".to_string(),
        ];
        Ok(Self::finish("vertices", lines, vars))
    }

    /// Neighbors of vertices matching `example`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad`, `Error::EdgeCollectionDoesNotExist`,
    /// `Error::VertexCollectionDoesNotExist` or `Error::InvalidParameter`.
    pub fn neighbors(&self, example: &Example, options: &TraversalOptions) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let (min, max) = self.depth(options.min_depth, options.max_depth, (1, 1))?;
        let lines = vec![
            self.with_statement(&options.edge_collection_restriction),
            Self::for_example(example, &self.vertex_collections, &mut vars, "start")?,
            format!(
                "FOR v, e IN {min}..{max} {} start {}",
                options.direction.keyword(),
                self.edge_restriction(&options.edge_collection_restriction, &mut vars)?
            ),
            "OPTIONS {bfs: true}".to_string(),
            Self::example_filter(&options.neighbor_examples, &mut vars, "v")?,
            Self::example_filter(&options.edge_examples, &mut vars, "e")?,
            self.vertex_restriction(
                &options.vertex_collection_restriction,
                &mut vars,
                "v",
                "vertex",
            )?,
            format!(
                "RETURN DISTINCT {}",
                if options.include_data { "v" } else { "v._id" }
            ),
        ];
        Ok(Self::finish("neighbors", lines, vars))
    }

    fn neighbor_set(
        &self,
        var: &str,
        options: &TraversalOptions,
        vars: &mut BindVars,
    ) -> Result<String> {
        let (min, max) = self.depth(options.min_depth, options.max_depth, (1, 1))?;
        Ok(format!(
            "LET {var}Neighbors = (FOR v IN {min}..{max} {} {var} {} OPTIONS {{bfs: true, uniqueVertices: \"global\"}} {} RETURN v)",
            options.direction.keyword(),
            self.edge_restriction(&options.edge_collection_restriction, vars)?,
            self.vertex_restriction(&options.vertex_collection_restriction, vars, "v", var)?
        ))
    }

    /// Pairs of distinct vertices matching the two examples together with
    /// their shared neighbors. Only pairs with shared neighbors are returned.
    ///
    /// # Errors
    ///
    /// Same as [`Self::neighbors`].
    pub fn common_neighbors(
        &self,
        left: &Example,
        right: &Example,
        left_options: &TraversalOptions,
        right_options: &TraversalOptions,
    ) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let with_restriction = if left_options.edge_collection_restriction.is_empty() {
            &right_options.edge_collection_restriction
        } else {
            &left_options.edge_collection_restriction
        };
        let include_data = left_options.include_data || right_options.include_data;

        let lines = vec![
            self.with_statement(with_restriction),
            Self::for_example(left, &self.vertex_collections, &mut vars, "left")?,
            self.neighbor_set("left", left_options, &mut vars)?,
            Self::for_example(right, &self.vertex_collections, &mut vars, "right")?,
            "FILTER right != left".to_string(),
            self.neighbor_set("right", right_options, &mut vars)?,
            "LET neighbors = INTERSECTION(leftNeighbors, rightNeighbors)".to_string(),
            "FILTER LENGTH(neighbors) > 0".to_string(),
            if include_data {
                "RETURN {left: left, right: right, neighbors: neighbors}".to_string()
            } else {
                "RETURN {left: left._id, right: right._id, neighbors: neighbors[*]._id}"
                    .to_string()
            },
        ];
        Ok(Self::finish("common_neighbors", lines, vars))
    }

    fn shared_attributes(options: &CommonPropertiesOptions, vars: &mut BindVars) -> String {
        let ignored = if options.ignore_properties.is_empty() {
            ""
        } else {
            vars.bind("ignoreProperties", options.ignore_properties.clone());
            "a NOT IN @ignoreProperties AND "
        };
        format!(
            "LET shared = (FOR a IN ATTRIBUTES(left) FILTER a != \"_rev\" FILTER ({ignored}left[a] == right[a]) OR a == \"_id\" RETURN a)"
        )
    }

    /// For each vertex matching `left`, the vertices matching `right` that
    /// share at least one attribute value with it, reduced to those
    /// attributes.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` for malformed example ids.
    pub fn common_properties(
        &self,
        left: &Example,
        right: &Example,
        options: &CommonPropertiesOptions,
    ) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let lines = vec![
            Self::for_example(left, &self.vertex_collections, &mut vars, "left")?,
            "SORT left._id".to_string(),
            "LET toZip = (".to_string(),
            Self::for_example(right, &self.vertex_collections, &mut vars, "right")?,
            "FILTER right != left".to_string(),
            Self::shared_attributes(options, &mut vars),
            "FILTER LENGTH(shared) > 1".to_string(),
            "RETURN KEEP(right, shared))".to_string(),
            "FILTER LENGTH(toZip) > 0".to_string(),
            "RETURN ZIP([left._id], [toZip])".to_string(),
        ];
        Ok(Self::finish("common_properties", lines, vars))
    }

    /// Like [`Self::common_properties`] but returns the number of matching
    /// vertices per left vertex.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` for malformed example ids.
    pub fn count_common_properties(
        &self,
        left: &Example,
        right: &Example,
        options: &CommonPropertiesOptions,
    ) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let lines = vec![
            Self::for_example(left, &self.vertex_collections, &mut vars, "left")?,
            "SORT left._id".to_string(),
            "LET s = SUM(".to_string(),
            Self::for_example(right, &self.vertex_collections, &mut vars, "right")?,
            "FILTER right != left".to_string(),
            Self::shared_attributes(options, &mut vars),
            "FILTER LENGTH(shared) > 1".to_string(),
            "RETURN 1)".to_string(),
            "FILTER s > 0".to_string(),
            "RETURN ZIP([left._id], [s])".to_string(),
        ];
        Ok(Self::finish("count_common_properties", lines, vars))
    }

    /// All paths of the graph within the length bounds.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` for invalid lengths.
    pub fn paths(&self, options: &PathsOptions) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let (min, max) = self.depth(
            options.min_length,
            options.max_length,
            (self.limits.paths_min_length, self.limits.paths_max_length),
        )?;
        let lines = vec![
            format!("FOR source IN {}", Self::all_of(&self.vertex_collections)),
            format!(
                "FOR v, e, p IN {min}..{max} {} source {}",
                options.direction.keyword(),
                self.graph_ref(&mut vars)
            ),
            if options.follow_cycles {
                "OPTIONS {uniqueEdges: \"none\"}".to_string()
            } else {
                "OPTIONS {uniqueVertices: \"path\"}".to_string()
            },
            "RETURN {source: source, destination: v, edges: p.edges, vertice: p.vertices}"
                .to_string(),
        ];
        Ok(Self::finish("paths", lines, vars))
    }

    /// Shortest paths between vertices matching the two examples.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` for malformed example ids.
    pub fn shortest_path(
        &self,
        start: &Example,
        target: &Example,
        options: &PathOptions,
    ) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let start_loop = Self::for_example(start, &self.vertex_collections, &mut vars, "start")?;
        let target_loop =
            Self::for_example(target, &self.vertex_collections, &mut vars, "target")?;
        let graph = self.graph_ref(&mut vars);
        let weight_options = Self::weight_options(options.weight.as_ref(), &mut vars);
        let distance = if options.weight.is_some() {
            "IS_NULL(e) ? 0 : (IS_NUMBER(e[@attribute]) ? e[@attribute] : @default)"
        } else {
            "IS_NULL(e) ? 0 : 1"
        };

        let lines = vec![
            start_loop,
            target_loop,
            "FILTER target._id != start._id".to_string(),
            format!(
                "LET p = (FOR v, e IN {} SHORTEST_PATH start TO target {graph} {weight_options} RETURN {{v: v, e: e, d: {distance}}})",
                options.direction.keyword()
            ),
            "FILTER LENGTH(p) > 0".to_string(),
            if options.stop_at_first_match {
                "SORT SUM(p[*].d) LIMIT 1".to_string()
            } else {
                String::new()
            },
            "RETURN {vertices: p[*].v._id, edges: p[* FILTER CURRENT.e != null].e, distance: SUM(p[*].d)}"
                .to_string(),
        ];
        Ok(Self::finish("shortest_path", lines, vars))
    }

    /// Shortest-path distances between vertices matching the two examples.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` for malformed example ids.
    pub fn distance_to(
        &self,
        start: &Example,
        target: &Example,
        options: &PathOptions,
    ) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let lines = vec![
            Self::for_example(start, &self.vertex_collections, &mut vars, "start")?,
            Self::for_example(target, &self.vertex_collections, &mut vars, "target")?,
            "FILTER target._id != start._id".to_string(),
            format!(
                "LET p = {}",
                self.weighted_path(options, "start", "target", &mut vars)
            ),
            "FILTER LENGTH(p) > 0".to_string(),
            if options.stop_at_first_match {
                "SORT SUM(p) LIMIT 1".to_string()
            } else {
                String::new()
            },
            "RETURN {startVertex: start._id, vertex: target._id, distance: SUM(p)}".to_string(),
        ];
        Ok(Self::finish("distance_to", lines, vars))
    }

    /// `[id, eccentricity]` rows for vertices matching `example`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` for malformed example ids.
    pub fn absolute_eccentricity(
        &self,
        example: &Example,
        options: &PathOptions,
    ) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let lines = vec![
            Self::for_example(example, &self.vertex_collections, &mut vars, "start")?,
            "LET lsp = (".to_string(),
            format!("FOR target IN {}", Self::all_of(&self.vertex_collections)),
            "FILTER target._id != start._id".to_string(),
            format!(
                "LET p = {}",
                self.weighted_path(options, "start", "target", &mut vars)
            ),
            "LET k = LENGTH(p) == 0 ? 0 : SUM(p) SORT k DESC LIMIT 1 RETURN k)".to_string(),
            "RETURN [start._id, lsp[0]]".to_string(),
        ];
        Ok(Self::finish("absolute_eccentricity", lines, vars))
    }

    /// `[id, farness]` rows (sum of shortest-path distances) for vertices
    /// matching `example`.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` for malformed example ids.
    pub fn absolute_closeness(
        &self,
        example: &Example,
        options: &PathOptions,
    ) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let lines = vec![
            Self::for_example(example, &self.vertex_collections, &mut vars, "start")?,
            "LET lsp = (".to_string(),
            format!("FOR target IN {}", Self::all_of(&self.vertex_collections)),
            "FILTER target._id != start._id".to_string(),
            format!(
                "LET p = {}",
                self.weighted_path(options, "start", "target", &mut vars)
            ),
            "LET k = LENGTH(p) == 0 ? 0 : SUM(p) RETURN k)".to_string(),
            "RETURN [start._id, SUM(lsp)]".to_string(),
        ];
        Ok(Self::finish("absolute_closeness", lines, vars))
    }

    /// One `{toFind, paths}` row: ids matching `example` and
    /// `[id, count]` pairs of how often each lies inside a shortest path.
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentHandleBad` for malformed example ids.
    pub fn absolute_betweenness(
        &self,
        example: &Example,
        options: &PathOptions,
    ) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let all = Self::all_of(&self.vertex_collections);
        let graph = self.graph_ref(&mut vars);
        let lines = vec![
            format!(
                "LET toFind = ({} RETURN start._id)",
                Self::for_example(example, &self.vertex_collections, &mut vars, "start")?
            ),
            "LET paths = (".to_string(),
            format!("FOR start IN {all}"),
            format!("FOR target IN {all}"),
            "FILTER start._id != target._id".to_string(),
            format!(
                "FOR v IN {} SHORTEST_PATH start TO target {graph} {}",
                options.direction.keyword(),
                Self::weight_options(options.weight.as_ref(), &mut vars)
            ),
            "FILTER v._id != start._id AND v._id != target._id AND v._id IN toFind".to_string(),
            "COLLECT id = v._id WITH COUNT INTO betweenness".to_string(),
            "RETURN [id, betweenness])".to_string(),
            "RETURN {toFind, paths}".to_string(),
        ];
        Ok(Self::finish("absolute_betweenness", lines, vars))
    }

    fn vertex_source(&self) -> (String, String) {
        if let [single] = self.vertex_collections.as_slice() {
            return (String::new(), quote(single));
        }
        let branches: Vec<String> = self
            .vertex_collections
            .iter()
            .map(|c| format!("(FOR x IN {} RETURN x)", quote(c)))
            .collect();
        (format!("LET ids = UNION({})", branches.join(", ")), "ids".to_string())
    }

    /// Smallest eccentricity over all vertices; at most one row.
    ///
    /// # Errors
    ///
    /// Never fails for a composer built with [`Self::new`].
    pub fn radius(&self, options: &PathOptions) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let (prelude, ids) = self.vertex_source();
        let lines = vec![
            prelude,
            format!("FOR s IN {ids} LET lsp = ("),
            format!(
                "FOR t IN {ids} FILTER s._id != t._id LET p = {}",
                self.weighted_path(options, "s", "t", &mut vars)
            ),
            "FILTER LENGTH(p) > 0 LET k = SUM(p) SORT k DESC LIMIT 1 RETURN k)".to_string(),
            "FILTER LENGTH(lsp) != 0".to_string(),
            "SORT lsp[0] ASC LIMIT 1 RETURN lsp[0]".to_string(),
        ];
        Ok(Self::finish("radius", lines, vars))
    }

    /// Largest shortest-path distance over all vertex pairs; at most one
    /// row.
    ///
    /// # Errors
    ///
    /// Never fails for a composer built with [`Self::new`].
    pub fn diameter(&self, options: &PathOptions) -> Result<ComposedQuery> {
        let mut vars = BindVars::default();
        let (prelude, ids) = self.vertex_source();
        let pair_filter = match options.direction {
            // Any direction is symmetric, each unordered pair once.
            Direction::Any => "FILTER s._id < t._id",
            Direction::Inbound | Direction::Outbound => "FILTER s._id != t._id",
        };
        let path = format!(
            "LET path = {}",
            self.weighted_path(options, "s", "t", &mut vars)
        );
        let lines = vec![
            prelude,
            format!("FOR s IN {ids} FOR t IN {ids}"),
            pair_filter.to_string(),
            path,
            "FILTER LENGTH(path) > 0".to_string(),
            "LET p = SUM(path) SORT p DESC LIMIT 1 RETURN p".to_string(),
        ];
        Ok(Self::finish("diameter", lines, vars))
    }
}
