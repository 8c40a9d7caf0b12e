//! Named iRODS status codes.
//!
//! The table is closed. Codes not listed here are still carried around as
//! raw integers by the error scanner.

use std::fmt;

macro_rules! error_codes {
    ($($variant:ident = ($code:expr, $name:expr),)*) => {
        /// A named iRODS status code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorCode {
            $($variant,)*
        }

        impl ErrorCode {
            /// Every named code, in table order.
            pub const ALL: &'static [ErrorCode] = &[$(ErrorCode::$variant,)*];

            /// Numeric status value.
            pub const fn code(self) -> i32 {
                match self {
                    $(ErrorCode::$variant => $code,)*
                }
            }

            /// Symbolic name as used by the server.
            pub const fn name(self) -> &'static str {
                match self {
                    $(ErrorCode::$variant => $name,)*
                }
            }
        }
    };
}

error_codes! {
    SysSockOpenErr = (-1000, "SYS_SOCK_OPEN_ERR"),
    SysSockBindErr = (-2000, "SYS_SOCK_BIND_ERR"),
    SysSockAcceptErr = (-3000, "SYS_SOCK_ACCEPT_ERR"),
    SysHeaderReadLenErr = (-4000, "SYS_HEADER_READ_LEN_ERR"),
    SysHeaderWriteLenErr = (-5000, "SYS_HEADER_WRITE_LEN_ERR"),
    SysHeaderTpyeLenErr = (-6000, "SYS_HEADER_TPYE_LEN_ERR"),
    SysCaughtSignal = (-7000, "SYS_CAUGHT_SIGNAL"),
    SysGetstartupPackErr = (-8000, "SYS_GETSTARTUP_PACK_ERR"),
    SysExceedConnectCnt = (-9000, "SYS_EXCEED_CONNECT_CNT"),
    SysUserNotAllowedToConn = (-10000, "SYS_USER_NOT_ALLOWED_TO_CONN"),
    SysReadMsgBodyInputErr = (-11000, "SYS_READ_MSG_BODY_INPUT_ERR"),
    SysUnmatchedApiNum = (-12000, "SYS_UNMATCHED_API_NUM"),
    SysNoApiPriv = (-13000, "SYS_NO_API_PRIV"),
    SysApiInputErr = (-14000, "SYS_API_INPUT_ERR"),
    SysPackInstructFormatErr = (-15000, "SYS_PACK_INSTRUCT_FORMAT_ERR"),
    SysMallocErr = (-16000, "SYS_MALLOC_ERR"),
    SysGetHostnameErr = (-17000, "SYS_GET_HOSTNAME_ERR"),
    SysOutOfFileDesc = (-18000, "SYS_OUT_OF_FILE_DESC"),
    SysFileDescOutOfRange = (-19000, "SYS_FILE_DESC_OUT_OF_RANGE"),
    SysUnrecognizedRemoteFlag = (-20000, "SYS_UNRECOGNIZED_REMOTE_FLAG"),
    SysInvalidServerHost = (-21000, "SYS_INVALID_SERVER_HOST"),
    SysSvrToSvrConnectFailed = (-22000, "SYS_SVR_TO_SVR_CONNECT_FAILED"),
    SysBadFileDescriptor = (-23000, "SYS_BAD_FILE_DESCRIPTOR"),
    SysInternalNullInputErr = (-24000, "SYS_INTERNAL_NULL_INPUT_ERR"),
    SysConfigFileErr = (-25000, "SYS_CONFIG_FILE_ERR"),
    SysInvalidZoneName = (-26000, "SYS_INVALID_ZONE_NAME"),
    SysCopyLenErr = (-27000, "SYS_COPY_LEN_ERR"),
    SysPortCookieErr = (-28000, "SYS_PORT_COOKIE_ERR"),
    SysKeyValTableErr = (-29000, "SYS_KEY_VAL_TABLE_ERR"),
    SysInvalidRescType = (-30000, "SYS_INVALID_RESC_TYPE"),
    SysInvalidFilePath = (-31000, "SYS_INVALID_FILE_PATH"),
    SysInvalidRescInput = (-32000, "SYS_INVALID_RESC_INPUT"),
    SysInvalidPortalOpr = (-33000, "SYS_INVALID_PORTAL_OPR"),
    SysParaOprNoSupport = (-34000, "SYS_PARA_OPR_NO_SUPPORT"),
    SysInvalidOprType = (-35000, "SYS_INVALID_OPR_TYPE"),
    SysNoPathPermission = (-36000, "SYS_NO_PATH_PERMISSION"),
    SysNoIcatServerErr = (-37000, "SYS_NO_ICAT_SERVER_ERR"),
    SysAgentInitErr = (-38000, "SYS_AGENT_INIT_ERR"),
    SysProxyuserNoPriv = (-39000, "SYS_PROXYUSER_NO_PRIV"),
    SysNoDataObjPermission = (-40000, "SYS_NO_DATA_OBJ_PERMISSION"),
    SysDeleteDisallowed = (-41000, "SYS_DELETE_DISALLOWED"),
    SysOpenReiFileErr = (-42000, "SYS_OPEN_REI_FILE_ERR"),
    SysNoRcatServerErr = (-43000, "SYS_NO_RCAT_SERVER_ERR"),
    SysUnmatchPackInstructiName = (-44000, "SYS_UNMATCH_PACK_INSTRUCTI_NAME"),
    SysSvrToCliMsiNoExist = (-45000, "SYS_SVR_TO_CLI_MSI_NO_EXIST"),
    SysCopyAlreadyInResc = (-46000, "SYS_COPY_ALREADY_IN_RESC"),
    SysReconnOprMismatch = (-47000, "SYS_RECONN_OPR_MISMATCH"),
    SysInputPermOutOfRange = (-48000, "SYS_INPUT_PERM_OUT_OF_RANGE"),
    SysForkError = (-49000, "SYS_FORK_ERROR"),
    SysPipeError = (-50000, "SYS_PIPE_ERROR"),
    SysExecCmdStatusSzError = (-51000, "SYS_EXEC_CMD_STATUS_SZ_ERROR"),
    SysPathIsNotAFile = (-52000, "SYS_PATH_IS_NOT_A_FILE"),
    SysUnmatchedSpecCollType = (-53000, "SYS_UNMATCHED_SPEC_COLL_TYPE"),
    SysTooManyQueryResult = (-54000, "SYS_TOO_MANY_QUERY_RESULT"),
    SysSpecCollNotInCache = (-55000, "SYS_SPEC_COLL_NOT_IN_CACHE"),
    SysSpecCollObjNotExist = (-56000, "SYS_SPEC_COLL_OBJ_NOT_EXIST"),
    SysRegObjInSpecColl = (-57000, "SYS_REG_OBJ_IN_SPEC_COLL"),
    SysDestSpecCollSubExist = (-58000, "SYS_DEST_SPEC_COLL_SUB_EXIST"),
    SysSrcDestSpecCollConflict = (-59000, "SYS_SRC_DEST_SPEC_COLL_CONFLICT"),
    SysUnknownSpecCollClass = (-60000, "SYS_UNKNOWN_SPEC_COLL_CLASS"),
    SysMountMountedCollErr = (-73000, "SYS_MOUNT_MOUNTED_COLL_ERR"),
    CollectionNotMounted = (-74000, "COLLECTION_NOT_MOUNTED"),
    UserAuthStringEmpty = (-60000, "USER_AUTH_STRING_EMPTY"),
    CollectionNotEmpty = (-79000, "COLLECTION_NOT_EMPTY"),
    FederatedZoneNotAvailable = (-92111, "FEDERATED_ZONE_NOT_AVAILABLE"),
    SysRescDoesNotExist = (-78000, "SYS_RESC_DOES_NOT_EXIST"),
    InvalidInputParam = (-130000, "INVALID_INPUT_PARAM"),
    SysReplicaInaccessible = (-168000, "SYS_REPLICA_INACCESSIBLE"),
    UserAuthSchemeErr = (-300000, "USER_AUTH_SCHEME_ERR"),
    UserRodsHostEmpty = (-302000, "USER_RODS_HOST_EMPTY"),
    UserRodsHostnameErr = (-303000, "USER_RODS_HOSTNAME_ERR"),
    UserSockOpenErr = (-304000, "USER_SOCK_OPEN_ERR"),
    UserSockConnectErr = (-305000, "USER_SOCK_CONNECT_ERR"),
    UserStrlenToolong = (-306000, "USER_STRLEN_TOOLONG"),
    UserApiInputErr = (-307000, "USER_API_INPUT_ERR"),
    UserPackstructInputErr = (-308000, "USER_PACKSTRUCT_INPUT_ERR"),
    UserNoSupportErr = (-309000, "USER_NO_SUPPORT_ERR"),
    UserFileDoesNotExist = (-310000, "USER_FILE_DOES_NOT_EXIST"),
    UserFileTooLarge = (-311000, "USER_FILE_TOO_LARGE"),
    OverwiteWithoutForceFlag = (-312000, "OVERWITE_WITHOUT_FORCE_FLAG"),
    UnmatchedKeyOrIndex = (-313000, "UNMATCHED_KEY_OR_INDEX"),
    UserChksumMismatch = (-314000, "USER_CHKSUM_MISMATCH"),
    UserBadKeywordErr = (-315000, "USER_BAD_KEYWORD_ERR"),
    UserNullInputErr = (-316000, "USER__NULL_INPUT_ERR"),
    UserInputPathErr = (-317000, "USER_INPUT_PATH_ERR"),
    UserInputOptionErr = (-318000, "USER_INPUT_OPTION_ERR"),
    UserInvalidUsernameFormat = (-319000, "USER_INVALID_USERNAME_FORMAT"),
    UserDirectRescInputErr = (-320000, "USER_DIRECT_RESC_INPUT_ERR"),
    UserNoRescInputErr = (-321000, "USER_NO_RESC_INPUT_ERR"),
    UserParamLabelErr = (-322000, "USER_PARAM_LABEL_ERR"),
    UserParamTypeErr = (-323000, "USER_PARAM_TYPE_ERR"),
    Base64BufferOverflow = (-324000, "BASE64_BUFFER_OVERFLOW"),
    Base64InvalidPacket = (-325000, "BASE64_INVALID_PACKET"),
    UserMsgTypeNoSupport = (-326000, "USER_MSG_TYPE_NO_SUPPORT"),
    UserRsyncNoModeInputErr = (-337000, "USER_RSYNC_NO_MODE_INPUT_ERR"),
    UserOptionInputErr = (-338000, "USER_OPTION_INPUT_ERR"),
    SameSrcDestPathsErr = (-339000, "SAME_SRC_DEST_PATHS_ERR"),
    UserRestartFileInputErr = (-340000, "USER_RESTART_FILE_INPUT_ERR"),
    RestartOprFailed = (-341000, "RESTART_OPR_FAILED"),
    BadExecCmdPath = (-342000, "BAD_EXEC_CMD_PATH"),
    ExecCmdOutputTooLarge = (-343000, "EXEC_CMD_OUTPUT_TOO_LARGE"),
    ExecCmdError = (-344000, "EXEC_CMD_ERROR"),
    BadInputDescIndex = (-345000, "BAD_INPUT_DESC_INDEX"),
    UserPathExceedsMax = (-346000, "USER_PATH_EXCEEDS_MAX"),
    UserSockConnectTimedout = (-347000, "USER_SOCK_CONNECT_TIMEDOUT"),
    FileIndexLookupErr = (-500000, "FILE_INDEX_LOOKUP_ERR"),
    UnixFileOpenErr = (-510000, "UNIX_FILE_OPEN_ERR"),
    UnixFileCreateErr = (-511000, "UNIX_FILE_CREATE_ERR"),
    UnixFileReadErr = (-512000, "UNIX_FILE_READ_ERR"),
    UnixFileWriteErr = (-513000, "UNIX_FILE_WRITE_ERR"),
    UnixFileCloseErr = (-514000, "UNIX_FILE_CLOSE_ERR"),
    UnixFileUnlinkErr = (-515000, "UNIX_FILE_UNLINK_ERR"),
    UnixFileStatErr = (-516000, "UNIX_FILE_STAT_ERR"),
    UnixFileFstatErr = (-517000, "UNIX_FILE_FSTAT_ERR"),
    UnixFileLseekErr = (-518000, "UNIX_FILE_LSEEK_ERR"),
    UnixFileFsyncErr = (-519000, "UNIX_FILE_FSYNC_ERR"),
    UnixFileMkdirErr = (-520000, "UNIX_FILE_MKDIR_ERR"),
    UnixFileMkdir2Err = (-520002, "UNIX_FILE_MKDIR2_ERR"),
    UnixFileRmdirErr = (-521000, "UNIX_FILE_RMDIR_ERR"),
    UnixFileOpendirErr = (-522000, "UNIX_FILE_OPENDIR_ERR"),
    UnixFileClosedirErr = (-523000, "UNIX_FILE_CLOSEDIR_ERR"),
    UnixFileReaddirErr = (-524000, "UNIX_FILE_READDIR_ERR"),
    UnixFileStageErr = (-525000, "UNIX_FILE_STAGE_ERR"),
    UnixFileGetFsFreespaceErr = (-526000, "UNIX_FILE_GET_FS_FREESPACE_ERR"),
    UnixFileChmodErr = (-527000, "UNIX_FILE_CHMOD_ERR"),
    UnixFileRenameErr = (-528000, "UNIX_FILE_RENAME_ERR"),
    UnixFileTruncateErr = (-529000, "UNIX_FILE_TRUNCATE_ERR"),
    CatalogNotConnected = (-801000, "CATALOG_NOT_CONNECTED"),
    CatEnvErr = (-802000, "CAT_ENV_ERR"),
    CatConnectErr = (-803000, "CAT_CONNECT_ERR"),
    CatDisconnectErr = (-804000, "CAT_DISCONNECT_ERR"),
    CatCloseEnvErr = (-805000, "CAT_CLOSE_ENV_ERR"),
    CatSqlErr = (-806000, "CAT_SQL_ERR"),
    CatGetRowErr = (-807000, "CAT_GET_ROW_ERR"),
    CatNoRowsFound = (-808000, "CAT_NO_ROWS_FOUND"),
    CatalogAlreadyHasItemByThatName = (-809000, "CATALOG_ALREADY_HAS_ITEM_BY_THAT_NAME"),
    CatInvalidResourceType = (-810000, "CAT_INVALID_RESOURCE_TYPE"),
    CatInvalidResourceClass = (-811000, "CAT_INVALID_RESOURCE_CLASS"),
    CatInvalidResourceNetAddr = (-812000, "CAT_INVALID_RESOURCE_NET_ADDR"),
    CatInvalidResourceVaultPath = (-813000, "CAT_INVALID_RESOURCE_VAULT_PATH"),
    CatUnknownCollection = (-814000, "CAT_UNKNOWN_COLLECTION"),
    CatInvalidDataType = (-815000, "CAT_INVALID_DATA_TYPE"),
    CatInvalidArgument = (-816000, "CAT_INVALID_ARGUMENT"),
    CatUnknownFile = (-817000, "CAT_UNKNOWN_FILE"),
    CatNoAccessPermission = (-818000, "CAT_NO_ACCESS_PERMISSION"),
    CatSuccessButWithNoInfo = (-819000, "CAT_SUCCESS_BUT_WITH_NO_INFO"),
    CatInvalidUserType = (-820000, "CAT_INVALID_USER_TYPE"),
    CatCollectionNotEmpty = (-821000, "CAT_COLLECTION_NOT_EMPTY"),
    CatTooManyTables = (-822000, "CAT_TOO_MANY_TABLES"),
    CatUnknownTable = (-823000, "CAT_UNKNOWN_TABLE"),
    CatNotOpen = (-824000, "CAT_NOT_OPEN"),
    CatFailedToLinkTables = (-825000, "CAT_FAILED_TO_LINK_TABLES"),
    CatInvalidAuthentication = (-826000, "CAT_INVALID_AUTHENTICATION"),
    CatInvalidUser = (-827000, "CAT_INVALID_USER"),
    CatInvalidZone = (-828000, "CAT_INVALID_ZONE"),
    CatInvalidGroup = (-829000, "CAT_INVALID_GROUP"),
    CatInsufficientPrivilegeLevel = (-830000, "CAT_INSUFFICIENT_PRIVILEGE_LEVEL"),
    CatInvalidResource = (-831000, "CAT_INVALID_RESOURCE"),
    CatInvalidClientUser = (-832000, "CAT_INVALID_CLIENT_USER"),
    CatNameExistsAsCollection = (-833000, "CAT_NAME_EXISTS_AS_COLLECTION"),
    CatNameExistsAsDataobj = (-834000, "CAT_NAME_EXISTS_AS_DATAOBJ"),
    CatResourceNotEmpty = (-835000, "CAT_RESOURCE_NOT_EMPTY"),
    CatNotADataobjAndNotACollection = (-836000, "CAT_NOT_A_DATAOBJ_AND_NOT_A_COLLECTION"),
    CatRecursiveMove = (-837000, "CAT_RECURSIVE_MOVE"),
    CatLastReplica = (-838000, "CAT_LAST_REPLICA"),
    CatOciError = (-839000, "CAT_OCI_ERROR"),
    CatPasswordExpired = (-840000, "CAT_PASSWORD_EXPIRED"),
    SpecificQueryException = (-853000, "SPECIFIC_QUERY_EXCEPTION"),
    CatHostnameInvalid = (-855000, "CAT_HOSTNAME_INVALID"),
    CatTicketInvalid = (-890000, "CAT_TICKET_INVALID"),
    FileOpenErr = (-900000, "FILE_OPEN_ERR"),
    FileReadErr = (-901000, "FILE_READ_ERR"),
    FileWriteErr = (-902000, "FILE_WRITE_ERR"),
    PasswordExceedsMaxSize = (-903000, "PASSWORD_EXCEEDS_MAX_SIZE"),
    EnvironmentVarHomeNotDefined = (-904000, "ENVIRONMENT_VAR_HOME_NOT_DEFINED"),
    UnableToStatFile = (-905000, "UNABLE_TO_STAT_FILE"),
    AuthFileNotEncrypted = (-906000, "AUTH_FILE_NOT_ENCRYPTED"),
    AuthFileDoesNotExist = (-907000, "AUTH_FILE_DOES_NOT_EXIST"),
    UnlinkFailed = (-908000, "UNLINK_FAILED"),
    NoPasswordEntered = (-909000, "NO_PASSWORD_ENTERED"),
    PamAuthError = (-993000, "PAM_AUTH_ERROR"),
    ObjpathEmptyInStructErr = (-1000000, "OBJPATH_EMPTY_IN_STRUCT_ERR"),
    RescnameEmptyInStructErr = (-1001000, "RESCNAME_EMPTY_IN_STRUCT_ERR"),
    DatatypeEmptyInStructErr = (-1002000, "DATATYPE_EMPTY_IN_STRUCT_ERR"),
    DatasizeEmptyInStructErr = (-1003000, "DATASIZE_EMPTY_IN_STRUCT_ERR"),
    ChksumEmptyInStructErr = (-1004000, "CHKSUM_EMPTY_IN_STRUCT_ERR"),
    VersionEmptyInStructErr = (-1005000, "VERSION_EMPTY_IN_STRUCT_ERR"),
    FilepathEmptyInStructErr = (-1006000, "FILEPATH_EMPTY_IN_STRUCT_ERR"),
    ReplnumEmptyInStructErr = (-1007000, "REPLNUM_EMPTY_IN_STRUCT_ERR"),
    ReplstatusEmptyInStructErr = (-1008000, "REPLSTATUS_EMPTY_IN_STRUCT_ERR"),
    DataownerEmptyInStructErr = (-1009000, "DATAOWNER_EMPTY_IN_STRUCT_ERR"),
    DataownerzoneEmptyInStructErr = (-1010000, "DATAOWNERZONE_EMPTY_IN_STRUCT_ERR"),
    DataexpiryEmptyInStructErr = (-1011000, "DATAEXPIRY_EMPTY_IN_STRUCT_ERR"),
    DatacommentsEmptyInStructErr = (-1012000, "DATACOMMENTS_EMPTY_IN_STRUCT_ERR"),
    DatacreateEmptyInStructErr = (-1013000, "DATACREATE_EMPTY_IN_STRUCT_ERR"),
    DatamodifyEmptyInStructErr = (-1014000, "DATAMODIFY_EMPTY_IN_STRUCT_ERR"),
    DataaccessEmptyInStructErr = (-1015000, "DATAACCESS_EMPTY_IN_STRUCT_ERR"),
    DataaccessinxEmptyInStructErr = (-1016000, "DATAACCESSINX_EMPTY_IN_STRUCT_ERR"),
    NoRuleFoundErr = (-1017000, "NO_RULE_FOUND_ERR"),
    NoMoreRulesErr = (-1018000, "NO_MORE_RULES_ERR"),
    UnmatchedActionErr = (-1019000, "UNMATCHED_ACTION_ERR"),
    RulesFileReadError = (-1020000, "RULES_FILE_READ_ERROR"),
    ActionArgCountMismatch = (-1021000, "ACTION_ARG_COUNT_MISMATCH"),
    MaxNumOfArgsInActionExceeded = (-1022000, "MAX_NUM_OF_ARGS_IN_ACTION_EXCEEDED"),
    UnknownParamInRuleErr = (-1023000, "UNKNOWN_PARAM_IN_RULE_ERR"),
    DestrescnameEmptyInStructErr = (-1024000, "DESTRESCNAME_EMPTY_IN_STRUCT_ERR"),
    BackuprescnameEmptyInStructErr = (-1025000, "BACKUPRESCNAME_EMPTY_IN_STRUCT_ERR"),
    DataidEmptyInStructErr = (-1026000, "DATAID_EMPTY_IN_STRUCT_ERR"),
    CollidEmptyInStructErr = (-1027000, "COLLID_EMPTY_IN_STRUCT_ERR"),
    RescgroupnameEmptyInStructErr = (-1028000, "RESCGROUPNAME_EMPTY_IN_STRUCT_ERR"),
    StatusstringEmptyInStructErr = (-1029000, "STATUSSTRING_EMPTY_IN_STRUCT_ERR"),
    DatamapidEmptyInStructErr = (-1030000, "DATAMAPID_EMPTY_IN_STRUCT_ERR"),
    UsernameclientEmptyInStructErr = (-1031000, "USERNAMECLIENT_EMPTY_IN_STRUCT_ERR"),
    RodszoneclientEmptyInStructErr = (-1032000, "RODSZONECLIENT_EMPTY_IN_STRUCT_ERR"),
    UsertypeclientEmptyInStructErr = (-1033000, "USERTYPECLIENT_EMPTY_IN_STRUCT_ERR"),
    HostclientEmptyInStructErr = (-1034000, "HOSTCLIENT_EMPTY_IN_STRUCT_ERR"),
    AuthstrclientEmptyInStructErr = (-1035000, "AUTHSTRCLIENT_EMPTY_IN_STRUCT_ERR"),
    UserauthschemeclientEmptyInStructErr = (-1036000, "USERAUTHSCHEMECLIENT_EMPTY_IN_STRUCT_ERR"),
    UserinfoclientEmptyInStructErr = (-1037000, "USERINFOCLIENT_EMPTY_IN_STRUCT_ERR"),
    UsercommentclientEmptyInStructErr = (-1038000, "USERCOMMENTCLIENT_EMPTY_IN_STRUCT_ERR"),
    UsercreateclientEmptyInStructErr = (-1039000, "USERCREATECLIENT_EMPTY_IN_STRUCT_ERR"),
    UsermodifyclientEmptyInStructErr = (-1040000, "USERMODIFYCLIENT_EMPTY_IN_STRUCT_ERR"),
    UsernameproxyEmptyInStructErr = (-1041000, "USERNAMEPROXY_EMPTY_IN_STRUCT_ERR"),
    RodszoneproxyEmptyInStructErr = (-1042000, "RODSZONEPROXY_EMPTY_IN_STRUCT_ERR"),
    UsertypeproxyEmptyInStructErr = (-1043000, "USERTYPEPROXY_EMPTY_IN_STRUCT_ERR"),
    HostproxyEmptyInStructErr = (-1044000, "HOSTPROXY_EMPTY_IN_STRUCT_ERR"),
    AuthstrproxyEmptyInStructErr = (-1045000, "AUTHSTRPROXY_EMPTY_IN_STRUCT_ERR"),
    UserauthschemeproxyEmptyInStructErr = (-1046000, "USERAUTHSCHEMEPROXY_EMPTY_IN_STRUCT_ERR"),
    UserinfoproxyEmptyInStructErr = (-1047000, "USERINFOPROXY_EMPTY_IN_STRUCT_ERR"),
    UsercommentproxyEmptyInStructErr = (-1048000, "USERCOMMENTPROXY_EMPTY_IN_STRUCT_ERR"),
    UsercreateproxyEmptyInStructErr = (-1049000, "USERCREATEPROXY_EMPTY_IN_STRUCT_ERR"),
    UsermodifyproxyEmptyInStructErr = (-1050000, "USERMODIFYPROXY_EMPTY_IN_STRUCT_ERR"),
    CollnameEmptyInStructErr = (-1051000, "COLLNAME_EMPTY_IN_STRUCT_ERR"),
    CollparentnameEmptyInStructErr = (-1052000, "COLLPARENTNAME_EMPTY_IN_STRUCT_ERR"),
    CollownernameEmptyInStructErr = (-1053000, "COLLOWNERNAME_EMPTY_IN_STRUCT_ERR"),
    CollownerzoneEmptyInStructErr = (-1054000, "COLLOWNERZONE_EMPTY_IN_STRUCT_ERR"),
    CollexpiryEmptyInStructErr = (-1055000, "COLLEXPIRY_EMPTY_IN_STRUCT_ERR"),
    CollcommentsEmptyInStructErr = (-1056000, "COLLCOMMENTS_EMPTY_IN_STRUCT_ERR"),
    CollcreateEmptyInStructErr = (-1057000, "COLLCREATE_EMPTY_IN_STRUCT_ERR"),
    CollmodifyEmptyInStructErr = (-1058000, "COLLMODIFY_EMPTY_IN_STRUCT_ERR"),
    CollaccessEmptyInStructErr = (-1059000, "COLLACCESS_EMPTY_IN_STRUCT_ERR"),
    CollaccessinxEmptyInStructErr = (-1060000, "COLLACCESSINX_EMPTY_IN_STRUCT_ERR"),
    CollmapidEmptyInStructErr = (-1062000, "COLLMAPID_EMPTY_IN_STRUCT_ERR"),
    CollinheritanceEmptyInStructErr = (-1063000, "COLLINHERITANCE_EMPTY_IN_STRUCT_ERR"),
    ResczoneEmptyInStructErr = (-1065000, "RESCZONE_EMPTY_IN_STRUCT_ERR"),
    ResclocEmptyInStructErr = (-1066000, "RESCLOC_EMPTY_IN_STRUCT_ERR"),
    ResctypeEmptyInStructErr = (-1067000, "RESCTYPE_EMPTY_IN_STRUCT_ERR"),
    ResctypeinxEmptyInStructErr = (-1068000, "RESCTYPEINX_EMPTY_IN_STRUCT_ERR"),
    RescclassEmptyInStructErr = (-1069000, "RESCCLASS_EMPTY_IN_STRUCT_ERR"),
    RescclassinxEmptyInStructErr = (-1070000, "RESCCLASSINX_EMPTY_IN_STRUCT_ERR"),
    RescvaultpathEmptyInStructErr = (-1071000, "RESCVAULTPATH_EMPTY_IN_STRUCT_ERR"),
    NumopenOrtsEmptyInStructErr = (-1072000, "NUMOPEN_ORTS_EMPTY_IN_STRUCT_ERR"),
    ParaoprEmptyInStructErr = (-1073000, "PARAOPR_EMPTY_IN_STRUCT_ERR"),
    RescidEmptyInStructErr = (-1074000, "RESCID_EMPTY_IN_STRUCT_ERR"),
    GatewayaddrEmptyInStructErr = (-1075000, "GATEWAYADDR_EMPTY_IN_STRUCT_ERR"),
    RescmaxBjsizeEmptyInStructErr = (-1076000, "RESCMAX_BJSIZE_EMPTY_IN_STRUCT_ERR"),
    FreespaceEmptyInStructErr = (-1077000, "FREESPACE_EMPTY_IN_STRUCT_ERR"),
    FreespacetimeEmptyInStructErr = (-1078000, "FREESPACETIME_EMPTY_IN_STRUCT_ERR"),
    FreespacetimestampEmptyInStructErr = (-1079000, "FREESPACETIMESTAMP_EMPTY_IN_STRUCT_ERR"),
    RescinfoEmptyInStructErr = (-1080000, "RESCINFO_EMPTY_IN_STRUCT_ERR"),
    ResccommentsEmptyInStructErr = (-1081000, "RESCCOMMENTS_EMPTY_IN_STRUCT_ERR"),
    ResccreateEmptyInStructErr = (-1082000, "RESCCREATE_EMPTY_IN_STRUCT_ERR"),
    RescmodifyEmptyInStructErr = (-1083000, "RESCMODIFY_EMPTY_IN_STRUCT_ERR"),
    InputArgNotWellFormedErr = (-1084000, "INPUT_ARG_NOT_WELL_FORMED_ERR"),
    InputArgOutOfArgcRangeErr = (-1085000, "INPUT_ARG_OUT_OF_ARGC_RANGE_ERR"),
    InsufficientInputArgErr = (-1086000, "INSUFFICIENT_INPUT_ARG_ERR"),
    InputArgDoesNotMatchErr = (-1087000, "INPUT_ARG_DOES_NOT_MATCH_ERR"),
    RetryWithoutRecoveryErr = (-1088000, "RETRY_WITHOUT_RECOVERY_ERR"),
    CutActionProcessedErr = (-1089000, "CUT_ACTION_PROCESSED_ERR"),
    ActionFailedErr = (-1090000, "ACTION_FAILED_ERR"),
    FailActionEncounteredErr = (-1091000, "FAIL_ACTION_ENCOUNTERED_ERR"),
    VariableNameTooLongErr = (-1092000, "VARIABLE_NAME_TOO_LONG_ERR"),
    UnknownVariableMapErr = (-1093000, "UNKNOWN_VARIABLE_MAP_ERR"),
    UndefinedVariableMapErr = (-1094000, "UNDEFINED_VARIABLE_MAP_ERR"),
    NullValueErr = (-1095000, "NULL_VALUE_ERR"),
    DvarmapFileReadError = (-1096000, "DVARMAP_FILE_READ_ERROR"),
    NoRuleOrMsiFunctionFoundErr = (-1097000, "NO_RULE_OR_MSI_FUNCTION_FOUND_ERR"),
    FileCreateError = (-1098000, "FILE_CREATE_ERROR"),
    FmapFileReadError = (-1099000, "FMAP_FILE_READ_ERROR"),
    DateFormatErr = (-1100000, "DATE_FORMAT_ERR"),
    RuleFailedErr = (-1101000, "RULE_FAILED_ERR"),
    NoMicroserviceFoundErr = (-1102000, "NO_MICROSERVICE_FOUND_ERR"),
    InvalidRegexp = (-1103000, "INVALID_REGEXP"),
    InvalidObjectName = (-1104000, "INVALID_OBJECT_NAME"),
    InvalidObjectType = (-1105000, "INVALID_OBJECT_TYPE"),
    NoValuesFound = (-1106000, "NO_VALUES_FOUND"),
    NoColumnNameFound = (-1107000, "NO_COLUMN_NAME_FOUND"),
    RuleEngineError = (-1201000, "RULE_ENGINE_ERROR"),
    RuleEngineSyntaxError = (-1211000, "RULE_ENGINE_SYNTAX_ERROR"),
    KeyNotFound = (-1800000, "KEY_NOT_FOUND"),
    KeyTypeMismatch = (-1801000, "KEY_TYPE_MISMATCH"),
    ChildExists = (-1802000, "CHILD_EXISTS"),
    HierarchyError = (-1803000, "HIERARCHY_ERROR"),
    ChildNotFound = (-1804000, "CHILD_NOT_FOUND"),
    NoNextResourceFound = (-1805000, "NO_NEXT_RESOURCE_FOUND"),
    NoPdmoDefined = (-1806000, "NO_PDMO_DEFINED"),
    InvalidLocation = (-1807000, "INVALID_LOCATION"),
    PluginError = (-1808000, "PLUGIN_ERROR"),
    InvalidRescChildContext = (-1809000, "INVALID_RESC_CHILD_CONTEXT"),
    InvalidFileObject = (-1810000, "INVALID_FILE_OBJECT"),
    InvalidOperation = (-1811000, "INVALID_OPERATION"),
    ChildHasParent = (-1812000, "CHILD_HAS_PARENT"),
    FileNotInVault = (-1813000, "FILE_NOT_IN_VAULT"),
    DirectArchiveAccess = (-1814000, "DIRECT_ARCHIVE_ACCESS"),
    AdvancedNegotiationNotSupported = (-1815000, "ADVANCED_NEGOTIATION_NOT_SUPPORTED"),
    DirectChildAccess = (-1816000, "DIRECT_CHILD_ACCESS"),
    InvalidDynamicCast = (-1817000, "INVALID_DYNAMIC_CAST"),
    InvalidAccessToImpostorResource = (-1818000, "INVALID_ACCESS_TO_IMPOSTOR_RESOURCE"),
    InvalidLexicalCast = (-1819000, "INVALID_LEXICAL_CAST"),
    ControlPlaneMessageError = (-1820000, "CONTROL_PLANE_MESSAGE_ERROR"),
    ReplicaNotInResc = (-18210000, "REPLICA_NOT_IN_RESC"),
    InvalidAnyCast = (-1822000, "INVALID_ANY_CAST"),
    BadFunctionCall = (-1823000, "BAD_FUNCTION_CALL"),
    ClientNegotiationError = (-1824000, "CLIENT_NEGOTIATION_ERROR"),
    ServerNegotiationError = (-1825000, "SERVER_NEGOTIATION_ERROR"),
}

impl ErrorCode {
    /// Looks up a code. When two names share a value the first listed wins.
    pub fn from_code(code: i32) -> Option<ErrorCode> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(ErrorCode::from_code(-808000), Some(ErrorCode::CatNoRowsFound));
        assert_eq!(ErrorCode::CatNoRowsFound.name(), "CAT_NO_ROWS_FOUND");
        assert_eq!(ErrorCode::from_code(-816000), Some(ErrorCode::CatInvalidArgument));
        assert!(ErrorCode::from_code(-123_456_789).is_none());
        assert!(ErrorCode::from_code(0).is_none());
    }

    #[test]
    fn test_duplicate_value_resolves_to_first() {
        assert_eq!(
            ErrorCode::from_code(-60000),
            Some(ErrorCode::SysUnknownSpecCollClass)
        );
        assert_eq!(ErrorCode::UserAuthStringEmpty.code(), -60000);
    }

    #[test]
    fn test_all_codes_negative() {
        assert_eq!(ErrorCode::ALL.len(), 315);
        assert!(ErrorCode::ALL.iter().all(|c| c.code() < 0));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ErrorCode::CatSuccessButWithNoInfo.to_string(),
            "CAT_SUCCESS_BUT_WITH_NO_INFO(-819000)"
        );
    }
}
