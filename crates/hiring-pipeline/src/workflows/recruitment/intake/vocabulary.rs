/// Reference technology and process terms recognised in candidate documents.
///
/// Matching is a case-insensitive substring test, so order matters only for output:
/// extracted skills are reported in this order.
pub const SKILL_VOCABULARY: &[&str] = &[
    "Java",
    "Spring",
    "Spring Boot",
    "React",
    "Angular",
    "Vue.js",
    "Node.js",
    "JavaScript",
    "TypeScript",
    "Python",
    "Django",
    "Flask",
    "PHP",
    "Laravel",
    "Symfony",
    "C#",
    ".NET",
    "ASP.NET",
    "SQL",
    "MySQL",
    "PostgreSQL",
    "MongoDB",
    "Oracle",
    "Docker",
    "Kubernetes",
    "Jenkins",
    "GitLab CI",
    "GitHub Actions",
    "AWS",
    "Azure",
    "GCP",
    "Google Cloud",
    "HTML",
    "CSS",
    "SASS",
    "LESS",
    "Git",
    "SVN",
    "Mercurial",
    "REST",
    "GraphQL",
    "SOAP",
    "Agile",
    "Scrum",
    "Kanban",
    "Linux",
    "Unix",
    "Windows",
    "TDD",
    "BDD",
    "CI/CD",
    "Microservices",
    "API",
    "Redis",
    "Elasticsearch",
    "Kafka",
    "Machine Learning",
    "Deep Learning",
    "IA",
    "AI",
    "DevOps",
    "Cloud",
    "Serverless",
];
