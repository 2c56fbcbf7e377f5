use ledecouverte::FileKind;
use serde::{Deserialize, Serialize};

/// Architectural layer a file belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum ImpactLayer {
    /// Business logic (default bucket).
    CoreLogic,
    /// Models, schemas, persistence.
    DataLayer,
    /// Routes, controllers, handlers.
    ApiLayer,
    /// Components, views, styles.
    UiLayer,
    /// Tests and specs.
    TestLayer,
    /// Configuration files.
    ConfigLayer,
    /// Containers, CI, infrastructure.
    DeploymentLayer,
    /// Docs and readmes.
    Documentation,
}

impl Default for ImpactLayer {
    fn default() -> Self {
        Self::CoreLogic
    }
}

/// Static planning attributes of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSpec {
    /// Layer.
    pub layer: ImpactLayer,
    /// Task priority (1-10, higher runs first).
    pub priority: u8,
    /// Layers whose tasks must complete first. Always earlier in [`LAYER_TABLE`].
    pub depends_on: &'static [ImpactLayer],
}

/// Layer ordering, priorities and inter-layer dependencies.
pub const LAYER_TABLE: [LayerSpec; 8] = [
    LayerSpec {
        layer: ImpactLayer::CoreLogic,
        priority: 10,
        depends_on: &[],
    },
    LayerSpec {
        layer: ImpactLayer::DataLayer,
        priority: 9,
        depends_on: &[ImpactLayer::CoreLogic],
    },
    LayerSpec {
        layer: ImpactLayer::ApiLayer,
        priority: 8,
        depends_on: &[ImpactLayer::CoreLogic, ImpactLayer::DataLayer],
    },
    LayerSpec {
        layer: ImpactLayer::UiLayer,
        priority: 7,
        depends_on: &[ImpactLayer::ApiLayer],
    },
    LayerSpec {
        layer: ImpactLayer::TestLayer,
        priority: 6,
        depends_on: &[
            ImpactLayer::CoreLogic,
            ImpactLayer::DataLayer,
            ImpactLayer::ApiLayer,
            ImpactLayer::UiLayer,
        ],
    },
    LayerSpec {
        layer: ImpactLayer::ConfigLayer,
        priority: 5,
        depends_on: &[],
    },
    LayerSpec {
        layer: ImpactLayer::DeploymentLayer,
        priority: 4,
        depends_on: &[ImpactLayer::ConfigLayer],
    },
    LayerSpec {
        layer: ImpactLayer::Documentation,
        priority: 3,
        depends_on: &[ImpactLayer::CoreLogic, ImpactLayer::ApiLayer],
    },
];

impl ImpactLayer {
    /// Every layer in planning order.
    pub const ALL: [ImpactLayer; 8] = [
        Self::CoreLogic,
        Self::DataLayer,
        Self::ApiLayer,
        Self::UiLayer,
        Self::TestLayer,
        Self::ConfigLayer,
        Self::DeploymentLayer,
        Self::Documentation,
    ];

    /// Stable slug used in task ids and categories.
    pub fn slug(self) -> &'static str {
        match self {
            Self::CoreLogic => "core-logic",
            Self::DataLayer => "data-layer",
            Self::ApiLayer => "api-layer",
            Self::UiLayer => "ui-layer",
            Self::TestLayer => "test-layer",
            Self::ConfigLayer => "config-layer",
            Self::DeploymentLayer => "deployment-layer",
            Self::Documentation => "documentation",
        }
    }

    /// Parse a slug.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.slug() == value)
    }

    /// Human-readable title.
    pub fn title(self) -> &'static str {
        match self {
            Self::CoreLogic => "Core logic",
            Self::DataLayer => "Data layer",
            Self::ApiLayer => "API layer",
            Self::UiLayer => "UI layer",
            Self::TestLayer => "Tests",
            Self::ConfigLayer => "Configuration",
            Self::DeploymentLayer => "Deployment",
            Self::Documentation => "Documentation",
        }
    }

    /// Artifact kind of files in this layer.
    pub fn file_kind(self) -> FileKind {
        match self {
            Self::CoreLogic | Self::DataLayer | Self::ApiLayer | Self::UiLayer => FileKind::Code,
            Self::TestLayer => FileKind::Test,
            Self::ConfigLayer => FileKind::Config,
            Self::DeploymentLayer => FileKind::Deployment,
            Self::Documentation => FileKind::Documentation,
        }
    }

    /// Planning attributes from [`LAYER_TABLE`].
    pub fn spec(self) -> &'static LayerSpec {
        &LAYER_TABLE[self.position()]
    }

    /// Task priority of this layer.
    pub fn priority(self) -> u8 {
        self.spec().priority
    }

    /// Position in planning order.
    pub fn position(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for ImpactLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}
