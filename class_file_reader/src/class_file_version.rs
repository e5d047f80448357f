use crate::class_file_error::{ClassFileError, Result};

//https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.1-200-B.2
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, strum_macros::Display)]
#[allow(dead_code)]
pub enum ClassFileVersion {
    Jdk1_1,
    Jdk1_2,
    Jdk1_3,
    Jdk1_4,
    Jdk5,
    Jdk6,
    Jdk7,
    #[default]
    Jdk8,
    Jdk9,
    Jdk10,
    Jdk11,
    Jdk12,
    Jdk13,
    Jdk14,
    Jdk15,
    Jdk16,
    Jdk17,
    Jdk18,
    Jdk19,
    Jdk20,
    Jdk21,
}

impl ClassFileVersion {
    pub fn major(&self) -> u16 {
        match self {
            ClassFileVersion::Jdk1_1 => 45,
            ClassFileVersion::Jdk1_2 => 46,
            ClassFileVersion::Jdk1_3 => 47,
            ClassFileVersion::Jdk1_4 => 48,
            ClassFileVersion::Jdk5 => 49,
            ClassFileVersion::Jdk6 => 50,
            ClassFileVersion::Jdk7 => 51,
            ClassFileVersion::Jdk8 => 52,
            ClassFileVersion::Jdk9 => 53,
            ClassFileVersion::Jdk10 => 54,
            ClassFileVersion::Jdk11 => 55,
            ClassFileVersion::Jdk12 => 56,
            ClassFileVersion::Jdk13 => 57,
            ClassFileVersion::Jdk14 => 58,
            ClassFileVersion::Jdk15 => 59,
            ClassFileVersion::Jdk16 => 60,
            ClassFileVersion::Jdk17 => 61,
            ClassFileVersion::Jdk18 => 62,
            ClassFileVersion::Jdk19 => 63,
            ClassFileVersion::Jdk20 => 64,
            ClassFileVersion::Jdk21 => 65,
        }
    }

    /// Creates a version from the major and minor versions specified in the class file
    pub fn new(major: u16, minor: u16) -> Result<ClassFileVersion> {
        match major {
            45 => Ok(ClassFileVersion::Jdk1_1),
            46 => Ok(ClassFileVersion::Jdk1_2),
            47 => Ok(ClassFileVersion::Jdk1_3),
            48 => Ok(ClassFileVersion::Jdk1_4),
            49 => Ok(ClassFileVersion::Jdk5),
            50 => Ok(ClassFileVersion::Jdk6),
            51 => Ok(ClassFileVersion::Jdk7),
            52 => Ok(ClassFileVersion::Jdk8),
            53 => Ok(ClassFileVersion::Jdk9),
            54 => Ok(ClassFileVersion::Jdk10),
            55 => Ok(ClassFileVersion::Jdk11),
            56 => Ok(ClassFileVersion::Jdk12),
            57 => Ok(ClassFileVersion::Jdk13),
            58 => Ok(ClassFileVersion::Jdk14),
            59 => Ok(ClassFileVersion::Jdk15),
            60 => Ok(ClassFileVersion::Jdk16),
            61 => Ok(ClassFileVersion::Jdk17),
            62 => Ok(ClassFileVersion::Jdk18),
            63 => Ok(ClassFileVersion::Jdk19),
            64 => Ok(ClassFileVersion::Jdk20),
            65 => Ok(ClassFileVersion::Jdk21),
            _ => Err(ClassFileError::UnsupportedVersion(major, minor)),
        }
    }

    /// JDK 9 changed the layout of several bootstrap classes
    /// (java.lang.String in particular), callers key off this.
    pub fn is_at_least(&self, other: ClassFileVersion) -> bool {
        self.major() >= other.major()
    }
}

#[cfg(test)]
mod tests {
    use crate::{class_file_error::ClassFileError, class_file_version::ClassFileVersion};

    #[test]
    fn can_parse_known_versions() {
        assert_eq!(
            ClassFileVersion::Jdk8,
            ClassFileVersion::new(52, 45).unwrap()
        );
    }

    #[test]
    fn rejects_future_versions() {
        assert_eq!(
            Err(ClassFileError::UnsupportedVersion(99, 65535)),
            ClassFileVersion::new(99, 65535),
        );
    }

    #[test]
    fn version_ordering() {
        assert!(ClassFileVersion::Jdk9.is_at_least(ClassFileVersion::Jdk9));
        assert!(ClassFileVersion::Jdk17.is_at_least(ClassFileVersion::Jdk9));
        assert!(!ClassFileVersion::Jdk8.is_at_least(ClassFileVersion::Jdk9));
    }
}
