use super::enums::{RewardType, TaskType};

/// One stat change applied on completion or failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPoint {
    pub reward_type: RewardType,
    pub amount: i32,
}

impl RewardPoint {
    pub const fn new(amount: i32, reward_type: RewardType) -> Self {
        Self { reward_type, amount }
    }
}

/// Rewards and penalties for one task type
#[derive(Debug, Clone)]
pub struct TaskTypeDefinition {
    pub task_type: TaskType,
    pub description: &'static str,
    pub completion_rewards: Vec<RewardPoint>,
    pub failure_penalties: Vec<RewardPoint>,
    /// Opaque to the scheduler
    pub animation_trigger: Option<&'static str>,
}

/// Lookup table from task type to its definition
#[derive(Debug, Clone)]
pub struct TaskTypeCatalog {
    definitions: Vec<TaskTypeDefinition>,
}

impl TaskTypeCatalog {
    pub fn new(definitions: Vec<TaskTypeDefinition>) -> Self {
        Self { definitions }
    }

    pub fn definition(&self, task_type: TaskType) -> Option<&TaskTypeDefinition> {
        self.definitions.iter().find(|d| d.task_type == task_type)
    }

    #[cfg(test)]
    pub fn all(&self) -> &[TaskTypeDefinition] {
        &self.definitions
    }
}

fn def(
    task_type: TaskType,
    description: &'static str,
    animation_trigger: Option<&'static str>,
    completion_rewards: Vec<RewardPoint>,
    failure_penalties: Vec<RewardPoint>,
) -> TaskTypeDefinition {
    TaskTypeDefinition {
        task_type,
        description,
        completion_rewards,
        failure_penalties,
        animation_trigger,
    }
}

/// Built-in reward table
impl Default for TaskTypeCatalog {
    fn default() -> Self {
        use RewardType::{Health, Intelligence, Strength};

        Self::new(vec![
            def(
                TaskType::PhysicalExercise,
                "Workout, running, yoga, stretching",
                Some("Exercise"),
                vec![RewardPoint::new(1, Strength), RewardPoint::new(1, Health)],
                vec![RewardPoint::new(-1, Health)],
            ),
            def(
                TaskType::Sleep,
                "Night sleep, naps",
                Some("Sleep"),
                vec![RewardPoint::new(2, Health)],
                vec![RewardPoint::new(-1, Health), RewardPoint::new(-1, Strength)],
            ),
            def(
                TaskType::Eating,
                "Breakfast, lunch, dinner, healthy snacks",
                Some("Eat"),
                vec![RewardPoint::new(1, Health)],
                vec![RewardPoint::new(-1, Strength)],
            ),
            def(
                TaskType::WorkAndStudy,
                "Professional or academic work",
                Some("Work"),
                vec![RewardPoint::new(1, Intelligence)],
                vec![RewardPoint::new(-1, Intelligence)],
            ),
            def(
                TaskType::Housework,
                "Cleaning, paying bills, shopping",
                Some("Clean"),
                vec![RewardPoint::new(1, Strength)],
                vec![RewardPoint::new(-1, Health)],
            ),
            def(
                TaskType::Creative,
                "Reading, drawing, music, crafts",
                Some("Create"),
                vec![RewardPoint::new(1, Intelligence)],
                vec![RewardPoint::new(-1, Intelligence)],
            ),
            def(
                TaskType::Hygiene,
                "Shower, self-care, doctor visits",
                Some("Wash"),
                vec![RewardPoint::new(1, Health)],
                vec![RewardPoint::new(-1, Health)],
            ),
            def(
                TaskType::Rest,
                "Relaxing, walks, meeting friends",
                None,
                vec![RewardPoint::new(1, Health)],
                vec![RewardPoint::new(-1, Health)],
            ),
        ])
    }
}
