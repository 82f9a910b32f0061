//! 그래프 엔티티 값 (Node, Relationship, Path)

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::Value;

// ============================================================================
// Node - 그래프 노드
// ============================================================================

/// 그래프 노드
///
/// Bolt 5.0 미만에서는 엘리먼트 ID가 전송되지 않으므로 숫자 ID의
/// 10진 문자열로 채워집니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    /// 노드 ID
    pub id: i64,
    /// 레이블
    pub labels: Vec<String>,
    /// 속성
    pub properties: HashMap<String, Value>,
    /// 엘리먼트 ID
    pub element_id: String,
}

impl Node {
    /// 새 노드 생성
    pub fn new(id: i64, labels: Vec<String>, properties: HashMap<String, Value>) -> Self {
        Self {
            id,
            labels,
            properties,
            element_id: id.to_string(),
        }
    }

    /// 엘리먼트 ID 설정
    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = element_id.into();
        self
    }

    /// 레이블 포함 여부
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = if self.labels.is_empty() {
            String::new()
        } else {
            format!(":{}", self.labels.join(":"))
        };
        write!(f, "({}{})", self.id, labels)
    }
}

// ============================================================================
// Relationship - 그래프 관계
// ============================================================================

/// 그래프 관계
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    /// 관계 ID
    pub id: i64,
    /// 시작 노드 ID
    pub start_node_id: i64,
    /// 끝 노드 ID
    pub end_node_id: i64,
    /// 타입
    #[serde(rename = "type")]
    pub rel_type: String,
    /// 속성
    pub properties: HashMap<String, Value>,
    /// 엘리먼트 ID
    pub element_id: String,
    /// 시작 노드 엘리먼트 ID
    pub start_node_element_id: String,
    /// 끝 노드 엘리먼트 ID
    pub end_node_element_id: String,
}

impl Relationship {
    /// 새 관계 생성
    pub fn new(
        id: i64,
        start_node_id: i64,
        end_node_id: i64,
        rel_type: impl Into<String>,
        properties: HashMap<String, Value>,
    ) -> Self {
        Self {
            id,
            start_node_id,
            end_node_id,
            rel_type: rel_type.into(),
            properties,
            element_id: id.to_string(),
            start_node_element_id: start_node_id.to_string(),
            end_node_element_id: end_node_id.to_string(),
        }
    }

    /// 속성 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[:{}]->({})  [id: {}]",
            self.start_node_id, self.rel_type, self.end_node_id, self.id
        )
    }
}

/// 경로 안의 방향 없는 관계
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnboundRelationship {
    /// 관계 ID
    pub id: i64,
    /// 타입
    #[serde(rename = "type")]
    pub rel_type: String,
    /// 속성
    pub properties: HashMap<String, Value>,
    /// 엘리먼트 ID
    pub element_id: String,
}

impl UnboundRelationship {
    /// 새 관계 생성
    pub fn new(id: i64, rel_type: impl Into<String>, properties: HashMap<String, Value>) -> Self {
        Self {
            id,
            rel_type: rel_type.into(),
            properties,
            element_id: id.to_string(),
        }
    }

    fn bind(&self, start: &Node, end: &Node) -> Relationship {
        Relationship {
            id: self.id,
            start_node_id: start.id,
            end_node_id: end.id,
            rel_type: self.rel_type.clone(),
            properties: self.properties.clone(),
            element_id: self.element_id.clone(),
            start_node_element_id: start.element_id.clone(),
            end_node_element_id: end.element_id.clone(),
        }
    }
}

// ============================================================================
// Path - 그래프 경로
// ============================================================================

/// 그래프 경로
///
/// 와이어 표현 그대로 고유 노드, 고유 관계, 그리고 `[관계, 노드]` 쌍의
/// 인덱스 시퀀스를 보관합니다. 관계 인덱스는 1부터 시작하며 음수는
/// 역방향 이동을 뜻합니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Path {
    /// 고유 노드들
    pub nodes: Vec<Node>,
    /// 고유 관계들
    pub relationships: Vec<UnboundRelationship>,
    /// 세그먼트 인덱스
    pub indices: Vec<i64>,
}

impl Path {
    /// 새 경로 생성
    pub fn new(nodes: Vec<Node>, relationships: Vec<UnboundRelationship>, indices: Vec<i64>) -> Self {
        Self {
            nodes,
            relationships,
            indices,
        }
    }

    /// 경로 길이 (관계 수)
    pub fn len(&self) -> usize {
        self.indices.len() / 2
    }

    /// 빈 경로 여부
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// 시작 노드
    pub fn start(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// 끝 노드
    pub fn end(&self) -> Option<&Node> {
        let mut last = self.nodes.first()?;
        for pair in self.indices.chunks(2) {
            last = self.nodes.get(*pair.get(1)? as usize)?;
        }
        Some(last)
    }

    /// 인덱스를 따라 방향이 결정된 관계 목록. 인덱스가 잘못되면 `None`.
    pub fn segments(&self) -> Option<Vec<Relationship>> {
        let mut prev = self.nodes.first()?;
        let mut out = Vec::with_capacity(self.len());
        for pair in self.indices.chunks(2) {
            let (rel_index, node_index) = match pair {
                [r, n] => (*r, *n),
                _ => return None,
            };
            let next = self.nodes.get(usize::try_from(node_index).ok()?)?;
            let rel = match rel_index {
                0 => return None,
                r if r > 0 => self.relationships.get(r as usize - 1)?.bind(prev, next),
                r => self.relationships.get(r.unsigned_abs() as usize - 1)?.bind(next, prev),
            };
            out.push(rel);
            prev = next;
        }
        Some(out)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Path: {} nodes, {} hops>", self.nodes.len(), self.len())
    }
}
