use serde::{Deserialize, Serialize};

/// One row of the `employee_master` table: who a badge code belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub code_value: String,
    #[serde(default)]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

impl EmployeeRecord {
    pub fn new(code_value: impl Into<String>, employee_name: impl Into<String>) -> Self {
        Self {
            code_value: code_value.into(),
            employee_name: Some(employee_name.into()),
            department: None,
            company: None,
        }
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Name for status lines, falling back to the code itself.
    pub fn display_name(&self) -> &str {
        self.employee_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.code_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_rows_are_read() {
        let row = r#"{"code_value":"EMP-0007","employee_name":null}"#;
        let employee: EmployeeRecord = serde_json::from_str(row).unwrap();
        assert_eq!(employee.code_value, "EMP-0007");
        assert!(employee.department.is_none());
        assert_eq!(employee.display_name(), "EMP-0007");
    }

    #[test]
    fn display_name_prefers_the_employee_name() {
        let employee = EmployeeRecord::new("EMP-0001", "Ana Rahman").department("Drilling");
        assert_eq!(employee.display_name(), "Ana Rahman");
        assert_eq!(employee.department.as_deref(), Some("Drilling"));
    }
}
